use std::io::{Cursor, Read, Write};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;
use serde::{Deserialize, Serialize};
use crate::classifier::ClassificationModel;
use crate::common::{Error, ResultError};

/// cartola binary version
const CARTOLA_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The first 1024 bytes hold the metadata length (2 bytes), the metadata, then zero padding
const HEADER_SIZE: usize = 1024;

/// Metadata of the model file. Records the version of cartola that trained the model,
/// so a later version can upgrade or reject older files.
#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct Metadata {
    version: String,
}

pub(crate) fn encode_model(model: &ClassificationModel) -> ResultError<Vec<u8>> {
    let metadata = Metadata { version: CARTOLA_VERSION.to_string() };
    let metadata_encoded: Vec<u8> = bincode::serialize(&metadata)?;
    let metadata_length = metadata_encoded.len();
    if metadata_length > HEADER_SIZE - 2 {
        return Err(Error::IoError(format!("model metadata too large: {} bytes", metadata_length)));
    }

    let encoded: Vec<u8> = bincode::serialize(model)?;

    let mut buffer: Vec<u8> = Vec::with_capacity(HEADER_SIZE + encoded.len());
    buffer.write_u16::<LittleEndian>(metadata_length as u16)?;
    buffer.write_all(&metadata_encoded)?;
    buffer.write_all(&vec![0; HEADER_SIZE - 2 - metadata_length])?;
    buffer.write_all(&encoded)?;
    Ok(buffer)
}

pub(crate) fn decode_model(content: &[u8]) -> ResultError<ClassificationModel> {
    if content.len() < HEADER_SIZE {
        return Err(Error::IoError(format!("model file truncated: {} bytes", content.len())));
    }

    let mut cursor = Cursor::new(content);
    let metadata_len = cursor.read_u16::<LittleEndian>()? as usize;
    if metadata_len > HEADER_SIZE - 2 {
        return Err(Error::IoError("model file header is corrupt".to_string()));
    }
    let mut buffer = vec![0; metadata_len];
    cursor.read_exact(&mut buffer)?;
    let metadata: Metadata = bincode::deserialize(&buffer)?;
    info!("Model written by cartola {}", metadata.version);

    let model: ClassificationModel = bincode::deserialize(&content[HEADER_SIZE..])?;
    Ok(model)
}
