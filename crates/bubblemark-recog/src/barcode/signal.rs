//! Run-length extraction and width quantization for scan lines

/// Widths of alternating dark and light runs along a scan line.
///
/// The first run is dark. Leading and trailing light runs (quiet zones)
/// are dropped, so the result has odd length unless empty.
pub fn dark_runs(line: &[u8], dark_threshold: u8) -> Vec<u32> {
    let first = line.iter().position(|&v| v < dark_threshold);
    let last = line.iter().rposition(|&v| v < dark_threshold);
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };

    let mut runs = Vec::new();
    let mut current_dark = true;
    let mut width = 0u32;
    for &v in &line[first..=last] {
        let dark = v < dark_threshold;
        if dark == current_dark {
            width += 1;
        } else {
            runs.push(width);
            current_dark = dark;
            width = 1;
        }
    }
    runs.push(width);
    runs
}

/// Split runs into symbol candidates at light runs of at least `min_gap`
/// pixels.
pub fn split_on_gaps(runs: &[u32], min_gap: u32) -> Vec<&[u32]> {
    let mut out = Vec::new();
    let mut start = 0;
    // light runs sit at odd indices
    let mut i = 1;
    while i < runs.len() {
        if runs[i] >= min_gap {
            out.push(&runs[start..i]);
            start = i + 1;
        }
        i += 2;
    }
    if start < runs.len() {
        out.push(&runs[start..]);
    }
    out
}

/// Quantize run widths into narrow (`1`) and wide (`2`) elements.
///
/// Two-means clustering over the widths, seeded with the extremes. Returns
/// `None` when the runs do not separate into two width classes with a
/// wide/narrow ratio of at least 1.6, or when any width is ambiguous.
pub fn quantize_widths(runs: &[u32]) -> Option<String> {
    let min = *runs.iter().min()? as f64;
    let max = *runs.iter().max()? as f64;
    if min <= 0.0 || max / min < 1.6 {
        return None;
    }

    let (mut narrow, mut wide) = (min, max);
    for _ in 0..10 {
        let split = (narrow + wide) / 2.0;
        let (mut sn, mut cn, mut sw, mut cw) = (0.0, 0.0, 0.0, 0.0);
        for &r in runs {
            let r = r as f64;
            if r < split {
                sn += r;
                cn += 1.0;
            } else {
                sw += r;
                cw += 1.0;
            }
        }
        if cn == 0.0 || cw == 0.0 {
            return None;
        }
        narrow = sn / cn;
        wide = sw / cw;
    }
    if wide / narrow < 1.6 {
        return None;
    }

    let split = (narrow + wide) / 2.0;
    let margin = (wide - narrow) * 0.15;
    let mut out = String::with_capacity(runs.len());
    for &r in runs {
        let r = r as f64;
        if (r - split).abs() < margin {
            return None;
        }
        out.push(if r < split { '1' } else { '2' });
    }
    Some(out)
}
