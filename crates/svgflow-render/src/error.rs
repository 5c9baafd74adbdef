#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SVG parse error: {message}")]
    SvgParse { message: String },
    #[error("document root is not an <svg> element")]
    MissingSvgRoot,
}

pub type Result<T> = std::result::Result<T, Error>;
