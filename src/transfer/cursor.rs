use super::FifoPeriph;

/// Word sent while clocking in data that has no source in the write buffer.
pub const DUMMY_WORD: u8 = 0x00;

/// Progress of one transfer.
///
/// Reset by the foreground when a transfer is started and only advanced by
/// the interrupt handler afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Words pushed into the TX FIFO.
    pub tx_i: usize,
    /// Words to push in total.
    pub tx_len: usize,
    /// Words taken from the write buffer, the rest are [`DUMMY_WORD`].
    pub tx_data_len: usize,
    /// Words popped from the RX FIFO.
    pub rx_i: usize,
    /// Words to pop in total.
    pub rx_len: usize,
    /// Leading RX words that are dropped instead of stored.
    pub rx_skip: usize,
    /// Read length armed by a repeated start once the write phase is done.
    pub pending_rx_len: usize,
}

impl Cursor {
    /// Transmit `n` words, receive nothing.
    pub const fn write(n: usize) -> Self {
        Self {
            tx_i: 0,
            tx_len: n,
            tx_data_len: n,
            rx_i: 0,
            rx_len: 0,
            rx_skip: 0,
            pending_rx_len: 0,
        }
    }

    /// Receive `n` words, transmit nothing.
    pub const fn read(n: usize) -> Self {
        Self {
            tx_i: 0,
            tx_len: 0,
            tx_data_len: 0,
            rx_i: 0,
            rx_len: n,
            rx_skip: 0,
            pending_rx_len: 0,
        }
    }

    /// Transmit `w` words, then receive `r` words after the direction
    /// changed on the bus.
    pub const fn write_then_read(w: usize, r: usize) -> Self {
        let mut c = Self::write(w);
        c.pending_rx_len = r;
        c
    }

    /// Switch a [`write_then_read`](Self::write_then_read) cursor to its
    /// read phase. Returns the number of words to read.
    pub fn start_pending_read(&mut self) -> usize {
        let n = self.pending_rx_len;
        self.rx_i = 0;
        self.rx_len = n;
        self.rx_skip = 0;
        self.pending_rx_len = 0;
        n
    }

    /// Full duplex: every transmitted word clocks one word in.
    pub const fn duplex(n: usize) -> Self {
        Self {
            tx_i: 0,
            tx_len: n,
            tx_data_len: n,
            rx_i: 0,
            rx_len: n,
            rx_skip: 0,
            pending_rx_len: 0,
        }
    }

    /// Full duplex write, the words clocked in are dropped.
    pub const fn duplex_write(n: usize) -> Self {
        let mut c = Self::duplex(n);
        c.rx_skip = n;
        c
    }

    /// Full duplex read, dummy words are clocked out.
    pub const fn duplex_read(n: usize) -> Self {
        let mut c = Self::duplex(n);
        c.tx_data_len = 0;
        c
    }

    /// Full duplex write of `w` words followed by a read of `r` words
    /// within one chip select.
    pub const fn duplex_write_read(w: usize, r: usize) -> Self {
        let mut c = Self::duplex(w + r);
        c.tx_data_len = w;
        c.rx_skip = w;
        c
    }

    #[inline]
    pub fn is_tx_done(&self) -> bool {
        self.tx_i >= self.tx_len
    }

    #[inline]
    pub fn is_rx_done(&self) -> bool {
        self.rx_i >= self.rx_len
    }

    #[inline]
    pub fn rx_remaining(&self) -> usize {
        self.rx_len.saturating_sub(self.rx_i)
    }

    /// Words stored into the read buffer so far.
    #[inline]
    pub fn received(&self) -> usize {
        self.rx_i.saturating_sub(self.rx_skip)
    }

    /// RX FIFO level that raises the next interrupt. The FIFO only
    /// interrupts at the configured level, so the last partial chunk needs a
    /// level lower than the FIFO depth.
    #[inline]
    pub fn rx_threshold(&self, fifo_depth: usize) -> usize {
        self.rx_remaining().min(fifo_depth)
    }

    /// Pushes words into the TX FIFO while it has room.
    /// Returns the number of words pushed.
    pub fn fill<P: FifoPeriph>(&mut self, periph: &mut P, src: &[u8]) -> usize {
        let start = self.tx_i;
        while self.tx_i < self.tx_len && periph.tx_fifo_space() > 0 {
            let word = if self.tx_i < self.tx_data_len {
                src.get(self.tx_i).copied().unwrap_or(DUMMY_WORD)
            } else {
                DUMMY_WORD
            };
            periph.tx_fifo_push(word);
            self.tx_i += 1;
        }
        self.tx_i - start
    }

    /// Pops words from the RX FIFO while it is not empty and more words are
    /// expected. Returns the number of words popped.
    pub fn drain<P: FifoPeriph>(&mut self, periph: &mut P, dst: &mut [u8]) -> usize {
        let start = self.rx_i;
        while self.rx_i < self.rx_len && periph.rx_fifo_count() > 0 {
            let word = periph.rx_fifo_pop();
            if self.rx_i >= self.rx_skip
                && let Some(b) = dst.get_mut(self.rx_i - self.rx_skip)
            {
                *b = word;
            }
            self.rx_i += 1;
        }
        self.rx_i - start
    }
}
