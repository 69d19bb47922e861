mod apperror;
pub mod tileapihandler;

pub use apperror::AppError;

type Error = colorlayer::Error;
type Result<T> = colorlayer::Result<T>;
