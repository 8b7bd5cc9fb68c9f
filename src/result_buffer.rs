/*
Append-only delta + varint encoded record stream, switchable between
Write and Read mode. Bounds the memory of per-nice-tree-node DP tables
and exploits the lexicographic sortedness of the phi sequences the DP
emits.

Grounded in examples/original_source/src/resbuf.c and resbuf.h
(encode_num/decode_num, resbuf_chng_state, resbuf_push, resbuf_read).
The varint primitive itself comes from the `leb128` crate; the delta
tracking (`last`) is layered manually on top exactly as resbuf.c layers
its own hand-rolled varint under a `last` field.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Write,
    Read,
}

#[derive(Debug, Clone)]
pub struct ResultBuffer {
    data: Vec<u8>,
    cursor: usize,
    last: u32,
    mode: Mode,
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultBuffer {
    pub fn new() -> ResultBuffer {
        ResultBuffer { data: Vec::new(), cursor: 0, last: 0, mode: Mode::Write }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resets `last` and rewinds the buffer for the given mode:
    /// Write clears prior content, Read rewinds the read cursor to the
    /// head of whatever was written.
    pub fn set_mode(&mut self, mode: Mode) {
        self.last = 0;
        match mode {
            Mode::Write => {
                self.data.clear();
                self.cursor = 0;
            }
            Mode::Read => {
                self.cursor = 0;
            }
        }
        self.mode = mode;
    }

    fn encode(&mut self, x: u32) {
        let delta = x.wrapping_sub(self.last);
        leb128::write::unsigned(&mut self.data, delta as u64)
            .expect("writing to an in-memory Vec<u8> cannot fail");
        self.last = x;
    }

    fn decode(&mut self) -> Option<u32> {
        if self.cursor >= self.data.len() {
            return None;
        }
        let mut slice = &self.data[self.cursor..];
        let before = slice.len();
        let delta = leb128::read::unsigned(&mut slice).expect("corrupt varint stream") as u32;
        self.cursor += before - slice.len();
        let x = self.last.wrapping_add(delta);
        self.last = x;
        Some(x)
    }

    /// Pushes one `(phi, colors)` record: `phi[0], …, phi[m-1], c,
    /// col[0], …, col[c-1]`, every integer delta+varint coded.
    pub fn push(&mut self, phi: &[u32], colors: &[u32]) {
        assert_eq!(self.mode, Mode::Write, "push requires the buffer to be in Write mode");
        for &x in phi {
            self.encode(x);
        }
        self.encode(colors.len() as u32);
        for &c in colors {
            self.encode(c);
        }
    }

    /// Reads one record, given the out-of-band agreed `phi` width `m`.
    /// Returns `None` at end of stream.
    pub fn read(&mut self, m: usize) -> Option<(Vec<u32>, Vec<u32>)> {
        assert_eq!(self.mode, Mode::Read, "read requires the buffer to be in Read mode");
        if self.cursor >= self.data.len() {
            return None;
        }
        let mut phi = Vec::with_capacity(m);
        for _ in 0..m {
            phi.push(self.decode().expect("truncated record: missing phi element"));
        }
        let c = self.decode().expect("truncated record: missing color count") as usize;
        let mut colors = Vec::with_capacity(c);
        for _ in 0..c {
            colors.push(self.decode().expect("truncated record: missing color entry"));
        }
        Some((phi, colors))
    }
}
