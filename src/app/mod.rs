pub mod controller;
pub mod coordinator;

pub use controller::AppController;
pub use coordinator::EngineCoordinator;
