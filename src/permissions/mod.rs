mod classifier;
mod confirmation;
mod gate;
mod paths;

pub use classifier::RiskClassifier;
pub use confirmation::has_confirmation_code;
pub use gate::PermissionGate;
pub use paths::ForbiddenPathSet;
