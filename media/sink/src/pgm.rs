/*!
    Binary greymap (PGM, `P5`) artifacts.

    The header is `P5\n<width> <height>\n<max>\n`, followed by `height`
    rows of `width` bytes taken from the frame's first plane.
*/

use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use media_types::{Error, Result, VideoFrame};

use crate::config::DEFAULT_PREFIX;
use crate::sink::FrameSink;

const MAGIC: &str = "P5";

/// Largest sample value of an 8-bit greymap.
pub const MAX_VALUE: u16 = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PgmHeader {
    pub width: u32,
    pub height: u32,
    pub max_value: u16,
}

impl PgmHeader {
    pub fn for_frame(frame: &VideoFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            max_value: MAX_VALUE,
        }
    }

    fn encode(&self) -> String {
        format!("{MAGIC}\n{} {}\n{}\n", self.width, self.height, self.max_value)
    }
}

fn check_frame(frame: &VideoFrame) -> Result<()> {
    if !frame.format.is_yuv() {
        return Err(Error::conversion_failed(format!(
            "{} has no luma plane to write as a greymap",
            frame.format
        )));
    }
    if frame.width == 0 || frame.height == 0 || !frame.is_well_formed() {
        return Err(Error::conversion_failed(format!(
            "cannot write {}x{} frame with malformed planes",
            frame.width, frame.height
        )));
    }
    Ok(())
}

/**
    Write `frame`'s luma plane as a binary PGM.

    Rows are copied one at a time since the plane stride may exceed the width.
*/
pub fn write_pgm<W: Write>(writer: &mut W, frame: &VideoFrame) -> Result<()> {
    check_frame(frame)?;

    writer.write_all(PgmHeader::for_frame(frame).encode().as_bytes())?;
    for y in 0..frame.height as usize {
        writer.write_all(frame.row(0, y))?;
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, msg.into()))
}

/**
    Next whitespace-delimited header token, skipping `#` comments.

    Consumes the single whitespace byte that ends the token.
*/
fn next_token<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut token = String::new();
    let mut byte = [0u8; 1];
    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
        match byte[0] {
            b'#' if token.is_empty() => {
                reader.read_until(b'\n', &mut Vec::new())?;
            }
            b if b.is_ascii_whitespace() => {
                if !token.is_empty() {
                    break;
                }
            }
            b => token.push(char::from(b)),
        }
    }

    if token.is_empty() {
        return Err(invalid("truncated PGM header"));
    }
    Ok(token)
}

fn parse_field<T: std::str::FromStr>(token: &str, field: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| invalid(format!("bad PGM {field} '{token}'")))
}

/**
    Parse a PGM header, leaving `reader` at the first raster byte.
*/
pub fn read_pgm_header<R: BufRead>(reader: &mut R) -> Result<PgmHeader> {
    let magic = next_token(reader)?;
    if magic != MAGIC {
        return Err(invalid(format!("not a binary PGM: magic '{magic}'")));
    }

    let width = parse_field(&next_token(reader)?, "width")?;
    let height = parse_field(&next_token(reader)?, "height")?;
    let max_value: u16 = parse_field(&next_token(reader)?, "maximum value")?;
    if max_value == 0 {
        return Err(invalid("PGM maximum value is zero"));
    }

    Ok(PgmHeader {
        width,
        height,
        max_value,
    })
}

/**
    Read a whole 8-bit PGM: header and raster.
*/
pub fn read_pgm<R: BufRead>(reader: &mut R) -> Result<(PgmHeader, Vec<u8>)> {
    let header = read_pgm_header(reader)?;
    if header.max_value > MAX_VALUE {
        return Err(invalid("16-bit PGM rasters are not supported"));
    }

    let mut raster = vec![0; header.width as usize * header.height as usize];
    reader.read_exact(&mut raster)?;
    Ok((header, raster))
}

/**
    Writes each frame to `<dir>/<prefix>-<sequence>.pgm`.

    Frames without a sequence number are numbered by arrival.
*/
#[derive(Debug)]
pub struct PgmSequenceSink {
    dir: PathBuf,
    prefix: String,
    written: u64,
}

impl PgmSequenceSink {
    /**
        Create the sink, creating `dir` if it does not exist.
    */
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            prefix: DEFAULT_PREFIX.to_string(),
            written: 0,
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, sequence: u64) -> PathBuf {
        self.dir.join(format!("{}-{sequence}.pgm", self.prefix))
    }

    fn write_file(path: &Path, frame: &VideoFrame) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        write_pgm(&mut writer, frame)?;
        writer.flush()?;
        Ok(())
    }
}

impl FrameSink for PgmSequenceSink {
    fn write_frame(&mut self, frame: &VideoFrame) -> Result<()> {
        check_frame(frame)?;

        let sequence = match frame.sequence {
            0 => self.written + 1,
            n => n,
        };
        let path = self.path_for(sequence);

        if let Err(e) = Self::write_file(&path, frame) {
            // Never leave a truncated artifact behind
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        self.written += 1;
        debug!(path = %path.display(), sequence, "wrote greymap");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}
