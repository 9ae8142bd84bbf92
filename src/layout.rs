use crate::model::ColumnWidths;

pub const MIN_WIDTH: usize = 80;
pub const ID_WIDTH: usize = 14;
pub const STATUS_WIDTH: usize = 16;
pub const MIN_NAME_WIDTH: usize = 20;
pub const MIN_IMAGE_WIDTH: usize = 25;
pub const MIN_PORTS_WIDTH: usize = 20;
/// Horizontal space kept for cell padding and borders.
pub const RESERVED_WIDTH: usize = 10;
/// Title, filter, status and help lines plus table chrome.
pub const RESERVED_LINES: usize = 10;
pub const MIN_TABLE_HEIGHT: usize = 10;
pub const FALLBACK_TABLE_HEIGHT: usize = 15;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TableLayout {
    pub columns: ColumnWidths,
    pub table_height: usize,
}

impl TableLayout {
    pub const FALLBACK: Self = Self {
        columns: ColumnWidths::FALLBACK,
        table_height: FALLBACK_TABLE_HEIGHT,
    };

    pub fn compute(width: usize, height: usize) -> Self {
        let width = width.max(MIN_WIDTH);
        let remaining = width.saturating_sub(ID_WIDTH + STATUS_WIDTH + RESERVED_WIDTH);

        let mut name = MIN_NAME_WIDTH.max(remaining / 3);
        let mut image = MIN_IMAGE_WIDTH.max(remaining / 3);
        let mut ports = remaining.saturating_sub(name + image);

        // The image minimum can push the sum past the available width; give
        // ports its minimum back out of name first, then image.
        if ports < MIN_PORTS_WIDTH {
            let mut deficit = MIN_PORTS_WIDTH - ports;
            let from_name = deficit.min(name - MIN_NAME_WIDTH);
            name -= from_name;
            deficit -= from_name;
            let from_image = deficit.min(image - MIN_IMAGE_WIDTH);
            image -= from_image;
            ports = remaining
                .saturating_sub(name + image)
                .max(MIN_PORTS_WIDTH);
        }

        Self {
            columns: ColumnWidths {
                id: ID_WIDTH,
                name,
                image,
                status: STATUS_WIDTH,
                ports,
            },
            table_height: MIN_TABLE_HEIGHT.max(height.saturating_sub(RESERVED_LINES)),
        }
    }

    pub fn total_width(&self) -> usize {
        self.columns.as_array().iter().sum::<usize>() + RESERVED_WIDTH
    }
}
