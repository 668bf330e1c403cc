use crate::core::error::{Error, Result};
use serde::{Serialize, Deserialize};

/// Compressed block storage for segment bodies
#[derive(Debug, Serialize, Deserialize)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,      // Fast compression, ratio 2-3x
    Zstd,     // Better ratio (3-5x), slower
}

impl CompressionType {
    pub fn code(&self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Lz4 => 1,
            CompressionType::Zstd => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lz4),
            2 => Ok(CompressionType::Zstd),
            other => Err(Error::corruption(format!("unknown compression code {}", other))),
        }
    }
}

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),

            CompressionType::Lz4 => lz4_flex::compress(data),

            CompressionType::Zstd => {
                zstd::encode_all(data, 3)?  // Level 3 is balanced
            }
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        let data = match self.compression {
            CompressionType::None => self.data.clone(),

            CompressionType::Lz4 => {
                // lz4 cannot expand a block by more than 255x
                if self.original_size > self.data.len().saturating_mul(255).saturating_add(16) {
                    return Err(Error::corruption(format!(
                        "lz4 block of {} bytes cannot hold {} bytes", self.data.len(), self.original_size
                    )));
                }
                lz4_flex::decompress(&self.data, self.original_size)
                    .map_err(|e| Error::corruption(format!("lz4: {}", e)))?
            }

            CompressionType::Zstd => {
                zstd::decode_all(&self.data[..])
                    .map_err(|e| Error::corruption(format!("zstd: {}", e)))?
            }
        };

        if data.len() != self.original_size {
            return Err(Error::corruption(format!(
                "decompressed {} bytes, expected {}", data.len(), self.original_size
            )));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_codec_restores_input() {
        let data = b"lucene in action lucene in action lucene in action".repeat(20);
        for compression in [CompressionType::None, CompressionType::Lz4, CompressionType::Zstd] {
            let block = CompressedBlock::compress(&data, compression).unwrap();
            assert_eq!(block.decompress().unwrap(), data);
        }
    }

    #[test]
    fn test_truncated_block_is_corruption() {
        let data = b"some segment body bytes".repeat(10);
        let mut block = CompressedBlock::compress(&data, CompressionType::Lz4).unwrap();
        block.data.truncate(block.data.len() / 2);
        let err = block.decompress().unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::StoreCorruption);
    }

    #[test]
    fn test_impossible_lz4_size_is_corruption() {
        let data = b"some segment body bytes".repeat(10);
        let mut block = CompressedBlock::compress(&data, CompressionType::Lz4).unwrap();
        block.original_size = usize::MAX;
        let err = block.decompress().unwrap_err();
        assert_eq!(err.kind, crate::core::error::ErrorKind::StoreCorruption);
    }

    #[test]
    fn test_compression_codes() {
        assert_eq!(CompressionType::from_code(CompressionType::Zstd.code()).unwrap(), CompressionType::Zstd);
        assert!(CompressionType::from_code(9).is_err());
    }
}
