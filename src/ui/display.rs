//! Character display abstraction and an in-memory implementation
//!
//! The LCD is a fixed grid of character cells addressed by column and row.
//! Custom glyphs live in slots 0..8 and are written as the characters
//! `'\u{0}'..'\u{7}'`.

use log::info;

pub const GLYPH_SLOTS: u8 = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayError {
    Bus(String),
    OutOfBounds { col: usize, row: usize },
    InvalidGlyphSlot(u8),
}

impl std::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisplayError::Bus(msg) => write!(f, "Display bus error: {}", msg),
            DisplayError::OutOfBounds { col, row } => {
                write!(f, "Cursor out of bounds: col {}, row {}", col, row)
            }
            DisplayError::InvalidGlyphSlot(slot) => write!(f, "Invalid glyph slot {}", slot),
        }
    }
}

impl std::error::Error for DisplayError {}

pub trait CharDisplay: Send {
    fn width(&self) -> usize;
    fn rows(&self) -> usize;
    fn move_cursor(&mut self, col: usize, row: usize) -> Result<(), DisplayError>;
    /// Write from the cursor; characters past the end of the row are dropped.
    fn write(&mut self, text: &str) -> Result<(), DisplayError>;
    fn clear(&mut self) -> Result<(), DisplayError>;
    fn power(&mut self, on: bool) -> Result<(), DisplayError>;
    fn backlight(&mut self, on: bool) -> Result<(), DisplayError>;
    fn define_glyph(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), DisplayError>;
}

/// Display RAM kept in memory, used by the simulator and the tests.
#[derive(Debug, Clone)]
pub struct MemoryDisplay {
    width: usize,
    cells: Vec<Vec<char>>,
    cursor: (usize, usize),
    powered: bool,
    backlight: bool,
    glyphs: [Option<[u8; 8]>; GLYPH_SLOTS as usize],
    faulty: bool,
    writes: usize,
}

impl MemoryDisplay {
    pub fn new(width: usize, rows: usize) -> Self {
        Self {
            width,
            cells: vec![vec![' '; width]; rows],
            cursor: (0, 0),
            powered: true,
            backlight: true,
            glyphs: [None; GLYPH_SLOTS as usize],
            faulty: false,
            writes: 0,
        }
    }

    /// Make every following device call fail, as a disconnected bus would.
    pub fn set_faulty(&mut self, faulty: bool) {
        self.faulty = faulty;
    }

    /// Row content without trailing blanks.
    pub fn row_text(&self, row: usize) -> String {
        self.cells
            .get(row)
            .map(|cells| cells.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        (0..self.cells.len()).map(|row| self.row_text(row)).collect()
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn is_backlight_on(&self) -> bool {
        self.backlight
    }

    pub fn glyph(&self, slot: u8) -> Option<[u8; 8]> {
        self.glyphs.get(usize::from(slot)).copied().flatten()
    }

    pub fn write_count(&self) -> usize {
        self.writes
    }

    fn check(&self) -> Result<(), DisplayError> {
        if self.faulty {
            return Err(DisplayError::Bus("no acknowledge from display".to_string()));
        }
        Ok(())
    }
}

impl CharDisplay for MemoryDisplay {
    fn width(&self) -> usize {
        self.width
    }

    fn rows(&self) -> usize {
        self.cells.len()
    }

    fn move_cursor(&mut self, col: usize, row: usize) -> Result<(), DisplayError> {
        self.check()?;
        if col >= self.width || row >= self.cells.len() {
            return Err(DisplayError::OutOfBounds { col, row });
        }
        self.cursor = (col, row);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), DisplayError> {
        self.check()?;
        let (mut col, row) = self.cursor;
        for c in text.chars() {
            if col >= self.width {
                break;
            }
            self.cells[row][col] = c;
            col += 1;
        }
        self.cursor = (col.min(self.width.saturating_sub(1)), row);
        self.writes += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.check()?;
        for row in self.cells.iter_mut() {
            row.iter_mut().for_each(|c| *c = ' ');
        }
        self.cursor = (0, 0);
        Ok(())
    }

    fn power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.check()?;
        self.powered = on;
        self.backlight = on;
        Ok(())
    }

    fn backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.check()?;
        self.backlight = on;
        Ok(())
    }

    fn define_glyph(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), DisplayError> {
        self.check()?;
        if slot >= GLYPH_SLOTS {
            return Err(DisplayError::InvalidGlyphSlot(slot));
        }
        self.glyphs[usize::from(slot)] = Some(*bitmap);
        Ok(())
    }
}

/// Memory display that prints every changed frame, for the host simulator.
pub struct ConsoleDisplay {
    inner: MemoryDisplay,
    last_frame: Vec<String>,
}

impl ConsoleDisplay {
    pub fn new(width: usize, rows: usize) -> Self {
        Self {
            inner: MemoryDisplay::new(width, rows),
            last_frame: Vec::new(),
        }
    }

    fn render_cell(c: char) -> char {
        match c {
            '\u{0}' => '↵',
            c if (c as u32) < GLYPH_SLOTS as u32 => '?',
            c => c,
        }
    }

    fn print_if_changed(&mut self) {
        let frame: Vec<String> = self
            .inner
            .lines()
            .iter()
            .map(|line| line.chars().map(Self::render_cell).collect())
            .collect();
        if frame == self.last_frame {
            return;
        }
        let width = self.inner.width();
        println!("+{}+", "-".repeat(width));
        for line in &frame {
            println!("|{:<width$}|", line, width = width);
        }
        println!("+{}+", "-".repeat(width));
        self.last_frame = frame;
    }
}

impl CharDisplay for ConsoleDisplay {
    fn width(&self) -> usize {
        self.inner.width()
    }

    fn rows(&self) -> usize {
        self.inner.rows()
    }

    fn move_cursor(&mut self, col: usize, row: usize) -> Result<(), DisplayError> {
        self.inner.move_cursor(col, row)
    }

    fn write(&mut self, text: &str) -> Result<(), DisplayError> {
        self.inner.write(text)?;
        self.print_if_changed();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.inner.clear()
    }

    fn power(&mut self, on: bool) -> Result<(), DisplayError> {
        if on != self.inner.is_powered() {
            info!("Display {}", if on { "on" } else { "off" });
        }
        self.inner.power(on)
    }

    fn backlight(&mut self, on: bool) -> Result<(), DisplayError> {
        self.inner.backlight(on)
    }

    fn define_glyph(&mut self, slot: u8, bitmap: &[u8; 8]) -> Result<(), DisplayError> {
        self.inner.define_glyph(slot, bitmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_clips_at_row_end() {
        let mut display = MemoryDisplay::new(8, 2);
        display.move_cursor(4, 1).unwrap();
        display.write("abcdefgh").unwrap();
        assert_eq!(display.row_text(1), "    abcd");
        assert_eq!(display.row_text(0), "");
    }

    #[test]
    fn test_cursor_bounds() {
        let mut display = MemoryDisplay::new(16, 2);
        assert_eq!(
            display.move_cursor(0, 2),
            Err(DisplayError::OutOfBounds { col: 0, row: 2 })
        );
    }

    #[test]
    fn test_glyph_slots() {
        let mut display = MemoryDisplay::new(16, 2);
        display.define_glyph(0, &[1; 8]).unwrap();
        assert_eq!(display.glyph(0), Some([1; 8]));
        assert!(display.define_glyph(8, &[0; 8]).is_err());
    }

    #[test]
    fn test_faulty_display_reports_bus_error() {
        let mut display = MemoryDisplay::new(16, 2);
        display.set_faulty(true);
        assert!(matches!(display.write("x"), Err(DisplayError::Bus(_))));
    }
}
