//! Incremental detokenization
//!
//! Decoding one token at a time produces broken words for subword
//! vocabularies. The streamer keeps a cache of pending token ids, decodes
//! the whole cache each step and only releases text up to a word boundary.

use anyhow::Result;
use tokenizers::Tokenizer;

/// Decode token ids to text with special tokens removed
pub trait TokenDecoder {
    fn decode_ids(&self, ids: &[u32]) -> Result<String>;
}

impl TokenDecoder for Tokenizer {
    fn decode_ids(&self, ids: &[u32]) -> Result<String> {
        self.decode(ids, true)
            .map_err(|e| anyhow::anyhow!("Tokenizer decode error: {}", e))
    }
}

impl<T: TokenDecoder + ?Sized> TokenDecoder for &T {
    fn decode_ids(&self, ids: &[u32]) -> Result<String> {
        (**self).decode_ids(ids)
    }
}

pub struct TextStreamer<D: TokenDecoder> {
    decoder: D,
    token_cache: Vec<u32>,
    /// Bytes of the decoded cache already released
    print_len: usize,
}

impl<D: TokenDecoder> TextStreamer<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            token_cache: Vec::new(),
            print_len: 0,
        }
    }

    /// Add a token and return whatever text is now final. Often empty.
    pub fn put(&mut self, token: u32) -> Result<String> {
        self.token_cache.push(token);
        let text = self.decoder.decode_ids(&self.token_cache)?;

        let printable = if text.ends_with('\n') {
            let printable = tail(&text, self.print_len).to_string();
            self.token_cache.clear();
            self.print_len = 0;
            printable
        } else if text.chars().last().is_some_and(is_cjk) {
            let printable = tail(&text, self.print_len).to_string();
            self.print_len = text.len();
            printable
        } else {
            match text.rfind(' ') {
                Some(idx) if idx + 1 > self.print_len => {
                    let printable = text
                        .get(self.print_len..=idx)
                        .unwrap_or_default()
                        .to_string();
                    self.print_len = idx + 1;
                    printable
                }
                _ => String::new(),
            }
        };

        Ok(printable)
    }

    /// Release the rest of the cache and reset for the next sequence
    pub fn end(&mut self) -> Result<String> {
        if self.token_cache.is_empty() {
            return Ok(String::new());
        }
        let text = self.decoder.decode_ids(&self.token_cache)?;
        let rest = tail(&text, self.print_len).to_string();
        self.token_cache.clear();
        self.print_len = 0;
        Ok(rest)
    }
}

fn tail(text: &str, from: usize) -> &str {
    text.get(from..).unwrap_or_default()
}

/// CJK ideographs are words on their own, so they are released immediately
fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF
        | 0x3400..=0x4DBF
        | 0x20000..=0x2A6DF
        | 0x2A700..=0x2B73F
        | 0x2B740..=0x2B81F
        | 0x2B820..=0x2CEAF
        | 0xF900..=0xFAFF
        | 0x2F800..=0x2FA1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Vocabulary of sentencepiece-style pieces; id 0 is a special token
    struct PieceDecoder(Vec<&'static str>);

    impl TokenDecoder for PieceDecoder {
        fn decode_ids(&self, ids: &[u32]) -> Result<String> {
            let text: String = ids
                .iter()
                .filter(|&&id| id != 0)
                .map(|&id| self.0[id as usize].replace('▁', " "))
                .collect();
            Ok(text.trim_start().to_string())
        }
    }

    fn vocab() -> PieceDecoder {
        PieceDecoder(vec!["<pad>", "▁Am", "anda", "▁baked", "▁cook", "ies", ".", "\n", "你", "好"])
    }

    fn stream(ids: &[u32]) -> Vec<String> {
        let mut streamer = TextStreamer::new(vocab());
        let mut out: Vec<String> = ids.iter().map(|&id| streamer.put(id).unwrap()).collect();
        out.push(streamer.end().unwrap());
        out
    }

    #[test]
    fn holds_text_until_word_boundary() {
        let out = stream(&[0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(out, vec!["", "", "", "Amanda ", "baked ", "", "", "cookies."]);
        assert_eq!(out.concat(), "Amanda baked cookies.");
    }

    #[test]
    fn newline_flushes_and_resets() {
        let out = stream(&[1, 2, 7, 3]);
        assert_eq!(out, vec!["", "", "Amanda\n", "", "baked"]);
    }

    #[test]
    fn cjk_is_released_immediately() {
        let out = stream(&[8, 9]);
        assert_eq!(out, vec!["你", "好", ""]);
    }

    #[test]
    fn end_without_tokens_is_empty() {
        let mut streamer = TextStreamer::new(vocab());
        assert_eq!(streamer.end().unwrap(), "");
    }
}
