// src/logging/vga.rs
//
// VGA テキストモード(0xb8000)へのログ表示。
// - 1 ログ行 = 1 画面行。上から順に書き、最下行の次は先頭行に戻る（スクロールしない）
// - 書いている行の次の行は常に空けておく（どこが最新かを画面上で見分けるため）
// - 行の色はログレベルで決める（ERROR は赤、OK は緑、それ以外は灰）
// - 80 桁を超えた分は折り返さずに捨てる（シリアル側には全部出ている）

use spin::Mutex;
use volatile::Volatile;

const VGA_BUFFER_ADDR: usize = 0xb8000;
const ROWS: usize = 25;
const COLS: usize = 80;

/// 行の色分け
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Error,
    Ok,
}

impl Tone {
    /// 黒地 + 前景色
    const fn attr(self) -> u8 {
        match self {
            Tone::Info => 0x07,
            Tone::Error => 0x0c,
            Tone::Ok => 0x0a,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
struct Cell {
    ch: u8,
    attr: u8,
}

const BLANK: Cell = Cell {
    ch: b' ',
    attr: Tone::Info.attr(),
};

// 表示できないバイトの代わり（CP437 の ■）
const UNPRINTABLE: u8 = 0xfe;

type Grid = [[Volatile<Cell>; COLS]; ROWS];

struct Screen {
    row: usize,
    col: usize,
    attr: u8,
    grid: &'static mut Grid,
}

impl Screen {
    fn clear_row(&mut self, row: usize) {
        for cell in self.grid[row].iter_mut() {
            cell.write(BLANK);
        }
    }

    fn put(&mut self, byte: u8) {
        match byte {
            b'\n' => self.end_line(),
            b'\r' => {}
            _ if self.col >= COLS => {}
            _ => {
                let ch = if (0x20..=0x7e).contains(&byte) {
                    byte
                } else {
                    UNPRINTABLE
                };
                let (row, col, attr) = (self.row, self.col, self.attr);
                self.grid[row][col].write(Cell { ch, attr });
                self.col += 1;
            }
        }
    }

    fn end_line(&mut self) {
        self.row = (self.row + 1) % ROWS;
        self.col = 0;
        self.attr = Tone::Info.attr();
        self.clear_row(self.row);
        self.clear_row((self.row + 1) % ROWS);
    }
}

static SCREEN: Mutex<Option<Screen>> = Mutex::new(None);

pub fn init() {
    // 0xb8000 は bootloader が identity map 済み。ここ以外から触らない。
    let grid = unsafe { &mut *(VGA_BUFFER_ADDR as *mut Grid) };
    let mut screen = Screen {
        row: 0,
        col: 0,
        attr: Tone::Info.attr(),
        grid,
    };
    for row in 0..ROWS {
        screen.clear_row(row);
    }
    *SCREEN.lock() = Some(screen);
}

/// 次に書く行の色を決める（行末で Info に戻る）
pub fn begin_line(tone: Tone) {
    if let Some(screen) = SCREEN.lock().as_mut() {
        screen.attr = tone.attr();
    }
}

pub fn write_str(s: &str) {
    if let Some(screen) = SCREEN.lock().as_mut() {
        s.bytes().for_each(|b| screen.put(b));
    }
}

pub fn write_line(s: &str) {
    if let Some(screen) = SCREEN.lock().as_mut() {
        s.bytes().for_each(|b| screen.put(b));
        screen.end_line();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen_on_heap() -> Screen {
        let grid: &'static mut Grid = Box::leak(Box::new(core::array::from_fn(|_| {
            core::array::from_fn(|_| Volatile::new(Cell { ch: b'#', attr: 0 }))
        })));
        Screen {
            row: 0,
            col: 0,
            attr: Tone::Info.attr(),
            grid,
        }
    }

    fn row_text(screen: &Screen, row: usize) -> String {
        screen.grid[row].iter().map(|c| c.read().ch as char).collect()
    }

    #[test]
    fn line_color_follows_tone_and_resets() {
        let mut s = screen_on_heap();
        s.attr = Tone::Error.attr();
        "[ERROR] x".bytes().for_each(|b| s.put(b));
        s.end_line();
        assert_eq!(s.grid[0][0].read().attr, 0x0c);
        assert_eq!(s.attr, Tone::Info.attr());
        assert!(row_text(&s, 0).starts_with("[ERROR] x"));
    }

    #[test]
    fn long_lines_are_cut_and_ring_wraps() {
        let mut s = screen_on_heap();
        for _ in 0..COLS + 10 {
            s.put(b'a');
        }
        s.put(0x01);
        assert_eq!(s.col, COLS);
        assert_eq!(row_text(&s, 0), "a".repeat(COLS));

        for _ in 0..ROWS {
            s.put(b'\n');
        }
        // 一周して先頭行に戻り、先頭行とその次の行は空になっている
        assert_eq!(s.row, 0);
        assert_eq!(row_text(&s, 0).trim_end(), "");
        assert_eq!(row_text(&s, 1).trim_end(), "");
    }
}
