pub mod billing;
pub mod whatsapp;
