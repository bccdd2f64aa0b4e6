use crate::areas::database::ObjectStore;
use crate::artifacts::objects::object::{Object, Packable, RevObject};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use std::io::{Read, Write};
use std::path::Path;

/// Loose objects, one zlib-compressed file per id
#[derive(Debug)]
pub struct FsObjectStore {
    path: Box<Path>,
}

impl FsObjectStore {
    pub fn new(path: Box<Path>) -> Self {
        FsObjectStore { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }
}

impl ObjectStore for FsObjectStore {
    fn get(&self, id: &ObjectId) -> anyhow::Result<Option<RevObject>> {
        let object_path = self.path.join(id.to_path());
        let object_content = match std::fs::read(&object_path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Unable to read object file {}", object_path.display())
                });
            }
        };

        let object_content = Self::decompress(object_content.into())?;
        RevObject::parse(object_content)
            .with_context(|| format!("Corrupt object {id}"))
            .map(Some)
    }

    fn put(&self, object: &RevObject) -> anyhow::Result<ObjectId> {
        let object_id = object.object_id()?;
        let object_path = self.path.join(object_id.to_path());

        // objects are immutable: an existing file already holds this content
        if !object_path.exists() {
            let object_content = Self::compress(object.serialize()?)?;
            super::write_atomic(&object_path, &object_content)?;
        }

        Ok(object_id)
    }

    fn exists(&self, id: &ObjectId) -> anyhow::Result<bool> {
        Ok(self.path.join(id.to_path()).exists())
    }
}
