pub mod group;
pub mod instance;
pub mod payment;
pub mod plan;
pub mod subscription;
pub mod user;

pub use group::{Group, GroupUpdate, NewGroup};
pub use instance::{Instance, NewInstance};
pub use payment::{Payment, PaymentUpsert};
pub use plan::{NewPlan, Plan, PlanUpdate};
pub use subscription::{NewSubscription, Subscription, SubscriptionStatus};
pub use user::{NewUser, Role, User, UserUpdate};
