pub mod blob;
pub mod clock;
pub mod identity;
pub mod ocr_engine;
pub mod secrets;

pub use blob::{BlobStore, ObjectHead, PresignOp, Presigned};
pub use clock::Clock;
pub use identity::IdentityProvider;
pub use ocr_engine::{EngineErrorKind, OCREngine, OcrEngineError, RawOcrResult};
pub use secrets::SecretsProvider;
