use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("mesh has no sections")]
    NoSections,
    #[error("{count} sections exceed the {max} a mesh key can address")]
    TooManySections { count: usize, max: usize },
    #[error("section {section} has {count} vertices, at most {max} allowed")]
    TooManyVertices { section: usize, count: usize, max: usize },
    #[error("section {section} has {count} primitives, at most {max} allowed")]
    TooManyPrimitives { section: usize, count: usize, max: usize },
    #[error("section {section} has {primitives} primitives but {flags} flag sets")]
    MismatchedPrimitiveArrays { section: usize, primitives: usize, flags: usize },
    #[error("primitive {primitive} of section {section} has invalid flags {bits:#04x}")]
    InvalidPrimitiveFlags { section: usize, primitive: usize, bits: u8 },
    #[error("primitive {primitive} of section {section} references vertex {index} of {vertex_count}")]
    VertexIndexOutOfRange {
        section: usize,
        primitive: usize,
        index: u8,
        vertex_count: usize,
    },
    #[error("blob is {actual} bytes, expected at least {expected}")]
    BlobTooSmall { expected: usize, actual: usize },
    #[error("{what} lies outside the blob")]
    ArrayOutOfBounds { what: &'static str },
    #[error("{what} is not aligned")]
    MisalignedArray { what: &'static str },
    #[error("{what} holds an out-of-range index")]
    IndexOutOfRange { what: &'static str },
    #[error("invalid mesh settings: {0}")]
    Settings(#[from] serde_json::Error),
}
