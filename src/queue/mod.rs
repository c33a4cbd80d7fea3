pub mod storage;

mod receiver;
pub use receiver::QueueReceiver;

mod worker;
pub use worker::WorkerHost;
