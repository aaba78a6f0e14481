use thiserror::Error;

#[derive(Error, Debug)]
pub enum WadError {
    #[error("unexpected wad magic (expected: `{0}`, got: `{1}`)")]
    BadMagic(String, String),
    #[error("container truncated (need `{needed}` bytes, have `{have}`)")]
    Truncated { needed: usize, have: usize },
    #[error("{0} section of `{1}` byte(s) does not fit the container")]
    SectionOutOfBounds(&'static str, usize),
    #[error("common key is missing or not 16 bytes")]
    MissingCommonKey,
    #[error("crypto input length `{0}` is not a multiple of 16")]
    Misaligned(usize),
    #[error("no content with index `{0}` in the title metadata")]
    ContentNotFound(u16),
    #[error("shared content `{0}` is missing from the store")]
    SharedContentMissing(String),
    #[error("content registry holds no usable last name")]
    MapExhausted,
    #[error("no counter value produces an accepted signature")]
    SignatureForgeExhausted,
    #[error("no IMET block found in banner data")]
    ImetNotFound,
    #[error("no `.{0}` file in the pack directory")]
    MissingCompanionFile(&'static str),
    #[error("unknown region code `{0}`")]
    UnknownRegion(u8),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
