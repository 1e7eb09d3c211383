//! Streaming copy with inline token substitution

use indexmap::IndexMap;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read/write chunk size
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Copy `reader` to `writer`, replacing every occurrence of each token with
/// its value.
///
/// Memory use is bounded by the chunk size plus the longest token. Tokens
/// split across chunk boundaries are still found. Scanning is left to right;
/// when several tokens start at the same position the longest wins, and
/// replaced text is not scanned again.
pub async fn copy_with_replacements<R, W>(
    reader: &mut R,
    writer: &mut W,
    replacements: &IndexMap<String, String>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    copy_chunked(reader, writer, replacements, BUFFER_SIZE).await
}

async fn copy_chunked<R, W>(
    reader: &mut R,
    writer: &mut W,
    replacements: &IndexMap<String, String>,
    chunk_size: usize,
) -> io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let replacer = Replacer::new(replacements);
    let mut chunk = vec![0u8; chunk_size];
    let mut pending: Vec<u8> = Vec::with_capacity(chunk_size + replacer.max_len);
    let mut out: Vec<u8> = Vec::with_capacity(chunk_size);

    loop {
        let read = reader.read(&mut chunk).await?;
        let eof = read == 0;
        pending.extend_from_slice(&chunk[..read]);

        out.clear();
        let consumed = replacer.process(&pending, eof, &mut out);
        writer.write_all(&out).await?;
        pending.drain(..consumed);

        if eof {
            break;
        }
    }

    writer.flush().await
}

struct Replacer {
    /// Longest first, so the first hit at a position is the longest
    tokens: Vec<(Vec<u8>, Vec<u8>)>,
    max_len: usize,
    starts: [bool; 256],
}

impl Replacer {
    fn new(replacements: &IndexMap<String, String>) -> Self {
        let mut tokens: Vec<(Vec<u8>, Vec<u8>)> = replacements
            .iter()
            .filter(|(token, _)| !token.is_empty())
            .map(|(token, value)| (token.as_bytes().to_vec(), value.as_bytes().to_vec()))
            .collect();
        tokens.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut starts = [false; 256];
        for (token, _) in &tokens {
            starts[token[0] as usize] = true;
        }

        Self {
            max_len: tokens.first().map_or(0, |(t, _)| t.len()),
            tokens,
            starts,
        }
    }

    /// Emit the substituted form of `input` into `out` and return how many
    /// input bytes were consumed.
    ///
    /// Unless `eof`, the last `max_len - 1` bytes are held back since a
    /// token starting there may continue in the next chunk.
    fn process(&self, input: &[u8], eof: bool, out: &mut Vec<u8>) -> usize {
        let limit = if eof {
            input.len()
        } else {
            input.len().saturating_sub(self.max_len.saturating_sub(1))
        };

        let mut pos = 0;
        let mut copied = 0;
        while pos < limit {
            if self.starts[input[pos] as usize] {
                let hit = self
                    .tokens
                    .iter()
                    .find(|(token, _)| input[pos..].starts_with(token));

                if let Some((token, value)) = hit {
                    out.extend_from_slice(&input[copied..pos]);
                    out.extend_from_slice(value);
                    pos += token.len();
                    copied = pos;
                    continue;
                }
            }
            pos += 1;
        }

        out.extend_from_slice(&input[copied..pos]);
        pos
    }
}
