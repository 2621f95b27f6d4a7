pub mod checkpoint;
pub mod context;
pub mod guard;
pub mod matcher;
pub mod promoter;
pub mod scanner;
pub mod scheduler;
