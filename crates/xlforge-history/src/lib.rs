pub mod stack;

pub use stack::HistoryManager;
