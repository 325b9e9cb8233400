//! Table detection from fragment geometry.
//!
//! Rows come from [`cluster_rows`]. Columns come from vertical ruling lines
//! when a segment has them, otherwise from horizontal gaps that recur at a
//! similar position across rows (stream mode). Gap inference is best-effort,
//! but deterministic: identical input always yields identical tables.

use crate::model::{
    BoundingBox, Cell, PageContent, Table, TableRow, TextFragment, Warning, WarningKind,
};

use super::options::{DetectorConfig, ExtractOptions};
use super::rows::{cluster_rows, row_tolerance, FragmentRow};

/// Horizontal slack before a fragment counts as crossing a column boundary.
const BOUNDARY_SLACK: f32 = 1.0;

/// Vertical lines closer than this are treated as one boundary.
const LINE_MERGE_DISTANCE: f32 = 1.0;

/// Tables and warnings found across a sequence of pages.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Tables in page and position order
    pub tables: Vec<Table>,
    /// Non-fatal issues
    pub warnings: Vec<Warning>,
}

/// Where the previous physical row ended, for continuation decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor {
    /// No row to continue
    None,
    /// Previous row on the same page
    Row { bottom: f32, center: f32 },
    /// Last row of the previous page, carried across the break
    PageBreak,
}

/// Multi-line continuation accumulator.
///
/// Holds the only cross-row state of detection. It is reset at table
/// segment boundaries, at horizontal ruling lines, and at page breaks unless
/// continuation across pages is enabled.
#[derive(Debug, Clone)]
struct ContinuationState {
    anchor: Anchor,
}

impl ContinuationState {
    fn new() -> Self {
        Self {
            anchor: Anchor::None,
        }
    }

    fn reset(&mut self) {
        self.anchor = Anchor::None;
    }

    fn page_break(&mut self, carry: bool) {
        self.anchor = match self.anchor {
            Anchor::Row { .. } | Anchor::PageBreak if carry => Anchor::PageBreak,
            _ => Anchor::None,
        };
    }

    fn advance(&mut self, row: &FragmentRow) {
        self.anchor = Anchor::Row {
            bottom: row.bottom,
            center: row.center_y(),
        };
    }

    /// Check if `row` may continue the previous logical row.
    fn accepts(&self, row: &FragmentRow, tolerance: f32, rules: &[f32]) -> bool {
        match self.anchor {
            Anchor::None => false,
            Anchor::PageBreak => true,
            Anchor::Row { bottom, center } => {
                let ruled = rules.iter().any(|&y| y > center && y < row.center_y());
                row.top - bottom < tolerance && !ruled
            }
        }
    }
}

/// Detects tables in decoded pages.
#[derive(Debug, Clone)]
pub struct TableDetector {
    config: DetectorConfig,
    continuation_across_pages: bool,
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TableDetector {
    /// Create a new table detector with default configuration.
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Create a new table detector with custom configuration.
    pub fn with_config(config: DetectorConfig) -> Self {
        Self {
            config,
            continuation_across_pages: false,
        }
    }

    /// Create a detector configured from extraction options.
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::with_config(options.detector.clone())
            .with_continuation_across_pages(options.continuation_across_pages)
    }

    /// Let continuation rows cross page boundaries.
    pub fn with_continuation_across_pages(mut self, enabled: bool) -> Self {
        self.continuation_across_pages = enabled;
        self
    }

    /// Detect tables in pages, processed sequentially in the given order.
    pub fn detect(&self, pages: &[PageContent]) -> Detection {
        let mut detection = Detection::default();
        let mut state = ContinuationState::new();

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                state.page_break(self.continuation_across_pages);
            }

            if page.fragments.is_empty() && page.lines.is_empty() {
                log::warn!("page {} has no fragments and no lines", page.page_index + 1);
                detection.warnings.push(Warning::on_page(
                    WarningKind::EmptyPage,
                    page.page_index,
                    "page has no text fragments and no ruling lines",
                ));
                state.reset();
                continue;
            }

            self.detect_page(page, &mut state, &mut detection.tables);
        }

        log::debug!(
            "TableDetector: {} tables across {} pages",
            detection.tables.len(),
            pages.len()
        );
        detection
    }

    fn detect_page(
        &self,
        page: &PageContent,
        state: &mut ContinuationState,
        tables: &mut Vec<Table>,
    ) {
        let tolerance = row_tolerance(&page.fragments, &self.config);
        let rows = cluster_rows(&page.fragments, tolerance);
        log::debug!(
            "TableDetector: page {} grouped into {} rows (tolerance {:.2})",
            page.page_index + 1,
            rows.len(),
            tolerance
        );
        if rows.is_empty() {
            state.reset();
            return;
        }

        let mut rules: Vec<f32> = page.horizontal_lines().map(|l| l.y()).collect();
        rules.sort_by(f32::total_cmp);

        for (seg_idx, segment) in self.segment(&rows, tolerance).into_iter().enumerate() {
            if seg_idx > 0 {
                state.reset();
            }

            let separators = self.column_separators(segment, page);
            let column_count = separators.len() + 1;
            log::debug!(
                "TableDetector: segment of {} rows, {} columns, separators {:?}",
                segment.len(),
                column_count,
                separators
            );

            let mut table = Table::new(column_count, page.page_index);
            table.column_boundaries = boundaries(segment, &separators);

            for row in segment {
                let cells = place_row(row, &separators);
                let filled = covered_columns(&cells);

                if filled < column_count && state.accepts(row, tolerance, &rules) {
                    let target = if table.rows.is_empty() {
                        tables.last_mut().and_then(|t| t.rows.last_mut())
                    } else {
                        table.rows.last_mut()
                    };
                    if let Some(target) = target {
                        append_continuation(target, cells);
                        state.advance(row);
                        continue;
                    }
                }

                table.add_row(TableRow::new(cells));
                state.advance(row);
            }

            if !table.is_empty() {
                tables.push(table);
            }
        }
    }

    /// Split rows into segments at vertical gaps wider than
    /// `table_gap_factor * tolerance`.
    fn segment<'r>(&self, rows: &'r [FragmentRow], tolerance: f32) -> Vec<&'r [FragmentRow]> {
        let limit = self.config.table_gap_factor * tolerance;
        let mut segments = Vec::new();
        let mut start = 0;
        for i in 1..rows.len() {
            if rows[i].top - rows[i - 1].bottom > limit {
                segments.push(&rows[start..i]);
                start = i;
            }
        }
        segments.push(&rows[start..]);
        segments
    }

    /// Interior column separators (sorted X positions) for a segment.
    fn column_separators(&self, rows: &[FragmentRow], page: &PageContent) -> Vec<f32> {
        let top = rows.iter().map(|r| r.top).fold(f32::INFINITY, f32::min);
        let bottom = rows.iter().map(|r| r.bottom).fold(f32::NEG_INFINITY, f32::max);

        let mut xs: Vec<f32> = page
            .vertical_lines()
            .filter(|l| {
                let (y0, y1) = l.y_span();
                y0 < bottom && y1 > top
            })
            .map(|l| l.x())
            .collect();

        if xs.is_empty() {
            return self.infer_separators(rows);
        }

        xs.sort_by(f32::total_cmp);
        xs.dedup_by(|b, a| (*b - *a).abs() < LINE_MERGE_DISTANCE);
        trim_outer_separators(xs, rows)
    }

    /// Infer separators from gaps shared by enough rows.
    ///
    /// Each gap of at least `min_column_gap` between consecutive fragments
    /// proposes its midpoint. Proposals are clustered left to right; a
    /// cluster becomes a separator when the number of distinct rows backing
    /// it reaches `min_gap_ratio` of the rows with two or more fragments.
    fn infer_separators(&self, rows: &[FragmentRow]) -> Vec<f32> {
        let multi_rows = rows.iter().filter(|r| r.len() >= 2).count();
        if multi_rows == 0 {
            return vec![];
        }

        let mut candidates: Vec<(f32, usize)> = Vec::new();
        for (row_idx, row) in rows.iter().enumerate() {
            let mut right = f32::NEG_INFINITY;
            for fragment in &row.fragments {
                if right.is_finite() && fragment.x0 - right >= self.config.min_column_gap {
                    candidates.push(((right + fragment.x0) / 2.0, row_idx));
                }
                right = right.max(fragment.x1);
            }
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let required = self.config.min_gap_ratio * multi_rows as f32;
        let mut separators = Vec::new();
        let mut cluster: Vec<(f32, usize)> = Vec::new();

        let mut flush = |cluster: &mut Vec<(f32, usize)>| {
            if cluster.is_empty() {
                return;
            }
            let mut supporting: Vec<usize> = cluster.iter().map(|c| c.1).collect();
            supporting.sort_unstable();
            supporting.dedup();
            if supporting.len() as f32 >= required {
                let mean = cluster.iter().map(|c| c.0).sum::<f32>() / cluster.len() as f32;
                separators.push(mean);
            }
            cluster.clear();
        };

        for candidate in candidates {
            if let Some(last) = cluster.last() {
                if candidate.0 - last.0 > self.config.min_column_gap {
                    flush(&mut cluster);
                }
            }
            cluster.push(candidate);
        }
        flush(&mut cluster);

        separators
    }
}

/// Drop ruling-line intervals at either edge that hold no fragment centre.
fn trim_outer_separators(mut xs: Vec<f32>, rows: &[FragmentRow]) -> Vec<f32> {
    let centers: Vec<f32> = rows
        .iter()
        .flat_map(|r| r.fragments.iter().map(TextFragment::center_x))
        .collect();

    while let Some(&first) = xs.first() {
        if centers.iter().any(|&c| c < first) {
            break;
        }
        xs.remove(0);
    }
    while let Some(&last) = xs.last() {
        if centers.iter().any(|&c| c > last) {
            break;
        }
        xs.pop();
    }
    xs
}

/// Outer and interior X boundaries of a segment's columns.
fn boundaries(rows: &[FragmentRow], separators: &[f32]) -> Vec<f32> {
    let left = rows
        .iter()
        .flat_map(|r| r.fragments.iter().map(|f| f.x0))
        .fold(f32::INFINITY, f32::min);
    let right = rows
        .iter()
        .flat_map(|r| r.fragments.iter().map(|f| f.x1))
        .fold(f32::NEG_INFINITY, f32::max);

    let mut edges = Vec::with_capacity(separators.len() + 2);
    edges.push(left.min(separators.first().copied().unwrap_or(left)));
    edges.extend_from_slice(separators);
    edges.push(right.max(separators.last().copied().unwrap_or(right)));
    edges
}

/// Column index of an X position.
fn column_at(x: f32, separators: &[f32]) -> usize {
    separators.iter().take_while(|&&s| s < x).count()
}

/// Lay one physical row out over the columns.
///
/// A fragment occupies the columns between its left and right edges; when
/// it crosses a boundary the cell sits in its first column with
/// `spans_cols > 1`. Fragments sharing a column are joined by a space.
fn place_row(row: &FragmentRow, separators: &[f32]) -> Vec<Cell> {
    let column_count = separators.len() + 1;
    let mut cells: Vec<Cell> = (0..column_count).map(|col| Cell::empty(0, col)).collect();

    for fragment in &row.fragments {
        let text = fragment.text.trim();
        let mut start = column_at(fragment.x0 + BOUNDARY_SLACK, separators);
        let mut end = column_at(fragment.x1 - BOUNDARY_SLACK, separators);
        if end < start {
            start = column_at(fragment.center_x(), separators);
            end = start;
        }

        let cell = &mut cells[start];
        if cell.text.is_empty() {
            cell.text = text.to_string();
        } else {
            cell.text.push(' ');
            cell.text.push_str(text);
        }
        cell.spans_cols = cell.spans_cols.max(end - start + 1);
        cell.bounding_box = Some(match cell.bounding_box {
            Some(bbox) => bbox.union(&fragment.bbox()),
            None => fragment.bbox(),
        });
    }

    cells
}

/// Number of columns covered by content, counting spanned positions.
fn covered_columns(cells: &[Cell]) -> usize {
    let mut covered = vec![false; cells.len()];
    for (col, cell) in cells.iter().enumerate() {
        if cell.is_empty() {
            continue;
        }
        let end = (col + cell.spans_cols).min(cells.len());
        for slot in &mut covered[col..end] {
            *slot = true;
        }
    }
    covered.into_iter().filter(|c| *c).count()
}

/// Fold a continuation row into the previous logical row, column by column.
fn append_continuation(target: &mut TableRow, cells: Vec<Cell>) {
    if target.cells.is_empty() {
        return;
    }
    let last = target.cells.len() - 1;
    for (col, cell) in cells.into_iter().enumerate() {
        if cell.is_empty() {
            continue;
        }
        let bbox: Option<BoundingBox> = cell.bounding_box;
        target.cells[col.min(last)].append_line(&cell.text, bbox);
    }
}
