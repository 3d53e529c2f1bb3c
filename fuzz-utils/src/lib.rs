//! Shared pieces for the fuzz targets: an arbitrary sequence of buffer commands, and a runner that
//! executes them against both [`Buffer`] and the flat [`Mock`]
//!
//! The `Debug` output of a [`CommandSequence`] is a Rust test that replays it, so a failing fuzz
//! input can be pasted straight into `tests/`.

use arbitrary::{Arbitrary, Unstructured};
use redwood::config::BufferConfig;
use redwood::mock::{join_adjacent, Mock};
use redwood::{Buffer, FillError, Segments, Source};
use std::fmt::{self, Debug, Display, Formatter};
use std::ops::Range;

/// Limit of every buffer in a run. Ranges are generated a little past the end, so that
/// out-of-limit requests get exercised too
pub const LIMIT: Range<u64> = 0..256;

const RANGE_SLACK: u64 = 16;

/// Maximum number of buffers alive at once
const MAX_BUFFERS: usize = 4;

/// The byte that the source produces at `offset`
pub fn byte_at(offset: u64) -> u8 {
    (offset * 7 % 251) as u8
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufId(usize);

impl Display for BufId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single operation on one of the buffers in a run
#[derive(Clone)]
pub enum Command {
    Read { id: BufId, range: Range<u64> },
    Write { id: BufId, range: Range<u64>, byte: u8 },
    Invalidate { id: BufId, range: Range<u64> },
    InvalidateAll { id: BufId },
    /// Iterate over `range`, stopping after `take` segments and then rewinding once
    Iterate { id: BufId, range: Range<u64>, take: u8 },
    /// Fork `src_id`, producing a new buffer with the next id
    Fork { src_id: BufId, new_id: BufId },
    Drop { id: BufId },
}

/// A sequence of [`Command`]s, along with the configuration the buffers are created with
pub struct CommandSequence {
    pub config: BufferConfig,
    pub cmds: Vec<Command>,
}

impl<'d> Arbitrary<'d> for CommandSequence {
    fn arbitrary(u: &mut Unstructured<'d>) -> arbitrary::Result<Self> {
        let mut config = BufferConfig::arbitrary(u)?;
        // keep chunks small enough that gaps get split into several leaves
        config.max_chunk_size %= 64;

        // `live[i]` is whether buffer `i` hasn't been dropped yet
        let mut live = vec![true];
        let mut cmds = Vec::new();

        while !u.is_empty() {
            let ids: Vec<usize> = (0..live.len()).filter(|&i| live[i]).collect();
            if ids.is_empty() {
                break;
            }
            let id = BufId(*u.choose(&ids)?);

            let cmd = match u.int_in_range(0_u8..=6)? {
                0 => Command::Read { id, range: arbitrary_range(u)? },
                1 => Command::Write { id, range: arbitrary_range(u)?, byte: u.arbitrary()? },
                2 => Command::Invalidate { id, range: arbitrary_range(u)? },
                3 => Command::InvalidateAll { id },
                4 => Command::Iterate { id, range: arbitrary_range(u)?, take: u.arbitrary()? },
                5 if ids.len() < MAX_BUFFERS => {
                    live.push(true);
                    Command::Fork { src_id: id, new_id: BufId(live.len() - 1) }
                }
                5 => continue,
                _ => {
                    live[id.0] = false;
                    Command::Drop { id }
                }
            };
            cmds.push(cmd);
        }

        Ok(CommandSequence { config, cmds })
    }
}

fn arbitrary_range(u: &mut Unstructured) -> arbitrary::Result<Range<u64>> {
    let start = u.int_in_range(0..=LIMIT.end + RANGE_SLACK)?;
    let len = u.int_in_range(0..=64)?;
    Ok(start..start + len)
}

impl Debug for CommandSequence {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("#[test]\n#[rustfmt::skip]\nfn auto_fuzz() {\n")?;
        writeln!(f, "    let config = {:?};", self.config)?;
        writeln!(
            f,
            "    let source = Source::new(|r: Range<u64>, d: &mut [u8]| -> Result<(), FillError> {{"
        )?;
        f.write_str("        for (b, i) in d.iter_mut().zip(r) { *b = (i * 7 % 251) as u8; }\n")?;
        f.write_str("        Ok(())\n")?;
        writeln!(f, "    }}, None).with_limit({LIMIT:?}).into_ref();")?;
        f.write_str("    let mut buf_0 = Buffer::with_config(source, config);\n")?;
        for c in &self.cmds {
            write!(f, "{c:?}")?;
        }
        f.write_str("}")
    }
}

impl Debug for Command {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Read { id, range } => writeln!(f, "    let _ = buf_{id}.read_to_vec({range:?});"),
            Self::Write { id, range, byte } => {
                let len = range.end - range.start;
                writeln!(f, "    let _ = buf_{id}.write({range:?}, &[{byte:#04x}; {len}]);")
            }
            Self::Invalidate { id, range } => writeln!(f, "    let _ = buf_{id}.invalidate({range:?});"),
            Self::InvalidateAll { id } => writeln!(f, "    buf_{id}.invalidate_all();"),
            Self::Iterate { id, range, take } => {
                f.write_str("    {\n")?;
                writeln!(f, "        if let Ok(mut segments) = buf_{id}.iterate({range:?}) {{")?;
                writeln!(f, "            let _ = segments.by_ref().take({take}).count();")?;
                f.write_str("            segments.rewind();\n")?;
                f.write_str("            let _ = segments.count();\n")?;
                f.write_str("        }\n")?;
                f.write_str("    }\n")
            }
            Self::Fork { src_id, new_id } => writeln!(f, "    let mut buf_{new_id} = buf_{src_id}.fork();"),
            Self::Drop { id } => writeln!(f, "    drop(buf_{id});"),
        }
    }
}

/// Ongoing state for executing commands against [`Buffer`]s and their mocks
pub struct RunnerState {
    config: BufferConfig,
    bufs: Vec<Option<(Buffer, Mock)>>,
}

impl RunnerState {
    /// Creates a new `RunnerState` with a single, fresh buffer
    pub fn init(config: BufferConfig) -> Self {
        let filler = |range: Range<u64>, dest: &mut [u8]| -> Result<(), FillError> {
            for (b, offset) in dest.iter_mut().zip(range) {
                *b = byte_at(offset);
            }
            Ok(())
        };
        let source = Source::new(filler, None).with_limit(LIMIT).into_ref();
        let buf = Buffer::with_config(source, config);

        RunnerState {
            config,
            bufs: vec![Some((buf, Mock::new(LIMIT, byte_at)))],
        }
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    fn get(&mut self, id: BufId) -> &mut (Buffer, Mock) {
        match self.bufs.get_mut(id.0) {
            Some(Some(pair)) => pair,
            _ => panic!("buffer {id} is not alive"),
        }
    }

    /// Runs the command, panicking if the buffer and the mock disagree
    pub fn run_cmd(&mut self, cmd: &Command) {
        match cmd {
            Command::Read { id, range } => {
                let (buf, mock) = self.get(*id);
                match (buf.read_to_vec(range.clone()), mock.read(range.clone())) {
                    (Ok(got), Ok(expected)) => assert_eq!(got, expected),
                    (Err(got), Err(expected)) => assert_eq!(got.kind(), expected.kind()),
                    (got, expected) => panic!("buffer gave {got:?}, mock gave {expected:?}"),
                }
            }
            Command::Write { id, range, byte } => {
                let (buf, mock) = self.get(*id);
                let data = vec![*byte; (range.end - range.start) as usize];
                let got = buf.write(range.clone(), &data);
                let expected = mock.write(range.clone(), &data);
                assert_eq!(got.is_ok(), expected.is_ok(), "{got:?} vs {expected:?}");
            }
            Command::Invalidate { id, range } => {
                let (buf, mock) = self.get(*id);
                let got = buf.invalidate(range.clone());
                let expected = mock.invalidate(range.clone());
                assert_eq!(got.is_ok(), expected.is_ok(), "{got:?} vs {expected:?}");
            }
            Command::InvalidateAll { id } => {
                let (buf, mock) = self.get(*id);
                buf.invalidate_all();
                mock.invalidate(..).unwrap();
            }
            Command::Iterate { id, range, take } => {
                let (buf, mock) = self.get(*id);
                let expected = mock.read(range.clone());
                match (buf.iterate(range.clone()), expected) {
                    (Ok(segments), Ok(expected)) => {
                        check_segments(segments, range.clone(), *take, &expected)
                    }
                    (Err(_), Err(_)) => (),
                    (got, expected) => {
                        let got = got.map(|_| ());
                        panic!("buffer gave {got:?}, mock gave {expected:?}")
                    }
                }
            }
            Command::Fork { src_id, new_id } => {
                let (buf, mock) = self.get(*src_id);
                let pair = (buf.fork(), mock.clone());
                assert_eq!(self.bufs.len(), new_id.0);
                self.bufs.push(Some(pair));
            }
            Command::Drop { id } => {
                drop(self.bufs[id.0].take());
                return;
            }
        }

        self.check(*cmd_id(cmd));
    }

    /// Checks that the buffer's tree is valid and that it agrees with the mock on exactly which
    /// offsets are materialized
    fn check(&mut self, id: BufId) {
        let (buf, mock) = self.get(id);
        buf.validate();
        assert_eq!(join_adjacent(buf.materialized()), mock.materialized());
    }

    /// Reads everything from every remaining buffer, checking against the mocks
    pub fn finish(mut self) {
        for (buf, mock) in self.bufs.iter_mut().flatten() {
            assert_eq!(buf.read_to_vec(..).unwrap(), mock.read(..).unwrap());
            buf.validate();
        }
    }
}

/// Takes `take` segments, rewinds, then checks that a full pass yields exactly `expected`
fn check_segments(mut segments: Segments<'_>, range: Range<u64>, take: u8, expected: &[u8]) {
    for s in segments.by_ref().take(take as usize) {
        assert!(!s.unwrap().is_empty());
    }
    segments.rewind();
    assert_eq!(segments.position(), range.start);

    let mut bytes = Vec::new();
    let mut pos = range.start;
    for s in segments {
        let s = s.unwrap();
        assert_eq!(s.offset(), pos);
        pos += s.len();
        bytes.extend_from_slice(s.bytes());
    }
    assert_eq!(pos, range.end);
    assert_eq!(bytes, expected);
}

fn cmd_id(cmd: &Command) -> &BufId {
    match cmd {
        Command::Read { id, .. }
        | Command::Write { id, .. }
        | Command::Invalidate { id, .. }
        | Command::InvalidateAll { id }
        | Command::Iterate { id, .. }
        | Command::Drop { id } => id,
        Command::Fork { new_id, .. } => new_id,
    }
}
