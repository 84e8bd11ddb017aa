use crate::config::Config;
use flate2::bufread;
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use stream_cache::files::{ByteSource, CachedStreamReader, StreamSource};


fn get_files_from_cfg(cfg: &Config) -> Vec<Option<PathBuf>> {
    let mut files: Vec<Option<_>> = cfg.filename.iter().cloned().map(Some).collect();
    if files.is_empty() {
        files.push(None);
    };
    files
}

fn is_gzip(file: &File) -> bool {
    // Check the magic number
    let mut buf = [0; 2];
    let mut file = file;
    file.read_exact(&mut buf).is_ok() && buf == [0x1f, 0x8b]
}

/// Open a file as a byte source. Gzip files are decompressed on the fly and can only be streamed.
pub fn open_source(path: Option<PathBuf>) -> io::Result<Box<dyn ByteSource>> {
    let Some(path) = path else {
        return Ok(Box::new(io::stdin()));
    };
    let mut file = File::open(&path)?;
    let gzip = is_gzip(&file);
    file.seek(SeekFrom::Start(0))?;
    if gzip {
        log::debug!("{:?}: gzip stream", path);
        let gzf = bufread::GzDecoder::new(BufReader::new(file));
        Ok(Box::new(StreamSource::new(gzf)))
    } else {
        Ok(Box::new(file))
    }
}

/// Copy `reader` to `out` in `chunk`-sized reads. With `verify_back`, after each chunk seek back over the tail of
/// what was just written, read it again and compare. Returns the number of bytes copied.
pub fn copy_stream<R: Read + Seek, W: Write>(
    reader: &mut R,
    out: &mut W,
    chunk: usize,
    verify_back: Option<usize>,
) -> io::Result<u64> {
    let mut buf = vec![0u8; chunk];
    let mut replay = Vec::new();
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        total += n as u64;

        if let Some(back) = verify_back {
            let back = back.min(n);
            if back == 0 {
                continue;
            }
            reader.seek(SeekFrom::Current(-(back as i64)))?;
            replay.resize(back, 0);
            reader.read_exact(&mut replay)?;
            if replay[..] != buf[n - back..n] {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("bytes replayed from offset {} differ from the original read", total - back as u64),
                ));
            }
        }
    }
    Ok(total)
}

pub fn cat_cmd(cfg: &Config) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for file in get_files_from_cfg(cfg) {
        let source = open_source(file.clone())?;
        let mut reader = CachedStreamReader::new(source, cfg.cache.clone());
        let bytes = copy_stream(&mut reader, &mut out, cfg.chunk, cfg.verify_back)?;
        log::info!("{:?}: copied {bytes} bytes", file);
    }
    out.flush()
}
