mod gateway;

pub use gateway::{RecognitionGateway, RecognitionOutcome, RecognitionResult};
