mod sink;

pub use sink::S3Sink;
