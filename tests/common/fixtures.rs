//! Block fixtures in the producer's on-store layout.

use super::RecordingStore;
use block_replicate::{BlockId, BlockMeta};

/// A block to write into a test store.
#[derive(Debug, Clone)]
pub struct TestBlock {
    pub id: BlockId,
    pub meta: BlockMeta,
    pub chunks: Vec<Vec<u8>>,
    pub index: Vec<u8>,
}

impl TestBlock {
    /// Raw, uncompacted block labelled `cluster=<cluster>` with one chunk.
    ///
    /// `seq` makes the id unique and orders ids independently of `min_time`.
    pub fn new(seq: u64, min_time: i64, cluster: &str) -> Self {
        let id = BlockId::from_parts(1_700_000_000_000 + seq, seq as u128);
        Self {
            id,
            meta: BlockMeta::new(id, min_time, min_time + 7_200_000).with_label("cluster", cluster),
            chunks: vec![format!("chunk-{}-1", seq).into_bytes()],
            index: format!("index-{}", seq).into_bytes(),
        }
    }

    pub fn with_chunks(mut self, n: usize) -> Self {
        self.chunks = (1..=n)
            .map(|i| format!("chunk-{}-{}", self.id, i).into_bytes())
            .collect();
        self
    }

    pub fn with_resolution(mut self, resolution: i64) -> Self {
        self.meta.thanos.downsample.resolution = resolution;
        self
    }

    pub fn with_compaction_level(mut self, level: i32) -> Self {
        self.meta.compaction.level = level;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.meta.version = version;
        self
    }

    pub fn without_labels(mut self) -> Self {
        self.meta.thanos.labels.clear();
        self
    }

    pub fn meta_bytes(&self) -> Vec<u8> {
        serde_json::to_vec_pretty(&self.meta).unwrap()
    }

    pub fn chunk_key(&self, i: usize) -> String {
        format!("{}/{:06}", self.id.chunks_dir(), i + 1)
    }

    /// Every object key of the block, descriptor last.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = (0..self.chunks.len()).map(|i| self.chunk_key(i)).collect();
        keys.push(self.id.index_path());
        keys.push(self.id.meta_path());
        keys
    }

    /// Write chunks and index only, as a producer mid-upload would.
    pub async fn write_data(&self, store: &RecordingStore) {
        for (i, chunk) in self.chunks.iter().enumerate() {
            store.insert(self.chunk_key(i), chunk.clone()).await;
        }
        store.insert(self.id.index_path(), self.index.clone()).await;
    }

    /// Write the complete block.
    pub async fn write(&self, store: &RecordingStore) {
        self.write_data(store).await;
        store.insert(self.id.meta_path(), self.meta_bytes()).await;
    }
}
