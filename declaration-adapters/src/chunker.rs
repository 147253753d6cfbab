use declaration_model::{CanonicalRecord, Chunk};

use crate::sections::sections;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkMode {
    StructurePreserving,
    SizeBased,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub mode: ChunkMode,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub min_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            mode: ChunkMode::StructurePreserving,
            chunk_size: 512,
            chunk_overlap: 50,
            min_chunk_size: 100,
        }
    }
}

/// Splits `text` into retrieval chunks per `config.mode`. Empty text yields
/// zero chunks in both modes.
pub fn chunk(declaration_id: &str, text: &str, record: &CanonicalRecord, config: &ChunkerConfig) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    match config.mode {
        ChunkMode::StructurePreserving => chunk_structure_preserving(declaration_id, text, record, config),
        ChunkMode::SizeBased => chunk_size_based(declaration_id, text, config),
    }
}

fn chunk_structure_preserving(declaration_id: &str, text: &str, record: &CanonicalRecord, config: &ChunkerConfig) -> Vec<Chunk> {
    let mut out = Vec::new();
    let mut index = 0u32;

    for section in sections(text, record) {
        if section.content.trim().is_empty() {
            continue;
        }
        if section.content.chars().count() <= config.chunk_size {
            if section.content.chars().count() >= config.min_chunk_size {
                out.push(build_chunk(declaration_id, index, &section.content, &section, config));
                index += 1;
            }
            continue;
        }

        let sentences: Vec<&str> = section.content.split(". ").filter(|s| !s.trim().is_empty()).collect();
        let mut sub_chunks: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0usize;

        for sentence in &sentences {
            let sentence_len = sentence.chars().count();
            if current_len + sentence_len > config.chunk_size && !current.is_empty() {
                sub_chunks.push(current.clone());
                let overlap_start = current.len().saturating_sub(config.chunk_overlap);
                current = current[overlap_start..].to_vec();
                current_len = current.iter().map(|s| s.chars().count()).sum();
            }
            current.push(sentence);
            current_len += sentence_len;
        }
        if !current.is_empty() {
            sub_chunks.push(current);
        }

        for sub in sub_chunks {
            let content = sub.join(". ");
            if content.trim().is_empty() {
                continue;
            }
            out.push(build_chunk(declaration_id, index, &content, &section, config));
            index += 1;
        }
    }

    out
}

fn build_chunk(
    declaration_id: &str,
    index: u32,
    content: &str,
    section: &crate::sections::Section,
    _config: &ChunkerConfig,
) -> Chunk {
    let mut c = Chunk::new(declaration_id, index, content.to_string());
    c.section = Some(section.tag);
    c.metadata.insert("section".to_string(), serde_json::json!(format!("{:?}", section.tag)));
    c.metadata.insert("preserve_structure".to_string(), serde_json::json!(true));
    for (k, v) in &section.metadata {
        c.metadata.insert(k.clone(), v.clone());
    }
    c
}

fn chunk_size_based(declaration_id: &str, text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() < config.min_chunk_size {
        return vec![Chunk::new(declaration_id, 0, text.to_string())];
    }

    let mut out = Vec::new();
    let mut index = 0u32;
    let mut window: Vec<&str> = Vec::new();

    for word in &words {
        window.push(word);
        if window.len() >= config.chunk_size {
            out.push(Chunk::new(declaration_id, index, window.join(" ")));
            index += 1;
            let overlap_start = window.len().saturating_sub(config.chunk_overlap);
            window = window[overlap_start..].to_vec();
        }
    }
    if window.len() >= config.min_chunk_size {
        out.push(Chunk::new(declaration_id, index, window.join(" ")));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_zero_chunks() {
        let record = CanonicalRecord::new(None);
        let config = ChunkerConfig::default();
        assert!(chunk("d1", "", &record, &config).is_empty());
    }

    #[test]
    fn short_text_below_min_yields_one_chunk_in_size_mode() {
        let record = CanonicalRecord::new(None);
        let config = ChunkerConfig { mode: ChunkMode::SizeBased, ..ChunkerConfig::default() };
        let chunks = chunk("d1", "a short note", &record, &config);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn chunk_indices_are_dense_and_zero_based() {
        let mut record = CanonicalRecord::new(None);
        record.manufacturer = Some("Samsung".to_string());
        record.product_code = Some("8504403000".to_string());
        let config = ChunkerConfig::default();
        let chunks = chunk("d1", "Manufacturer section.\nGoods: transformer.", &record, &config);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as u32);
        }
    }

    #[test]
    fn structure_mode_propagates_product_code_metadata() {
        let mut record = CanonicalRecord::new(None);
        record.product_code = Some("8504403000".to_string());
        record.product_description = Some("Transformer units".to_string());
        let config = ChunkerConfig::default();
        let chunks = chunk("d1", "goods description text", &record, &config);
        assert!(chunks.iter().any(|c| c.metadata.get("product_code").is_some()));
    }
}
