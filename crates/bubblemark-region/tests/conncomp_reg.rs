//! Connected component regression test
//!
//! A synthetic page carrying four square markers, a row of ring bubbles
//! and one filled bubble is labeled with 8-connectivity. Marker and bubble
//! components are then separated by fill ratio.

use bubblemark_core::{Pix, PixelDepth};
use bubblemark_region::{ComponentFilter, ConnectivityType, find_connected_components};
use bubblemark_test::RegParams;

fn page() -> Pix {
    let mut pm = Pix::new(200, 200, PixelDepth::Bit1).unwrap().to_mut();
    for &(x, y) in &[(20.0, 20.0), (170.0, 20.0), (20.0, 170.0), (170.0, 170.0)] {
        pm.fill_rect(x - 6.0, y - 6.0, x + 6.0, y + 6.0, 1);
    }
    for i in 0..4 {
        pm.stroke_circle(60.0 + 25.0 * i as f64, 100.0, 7.0, 0.8, 1);
    }
    pm.fill_disk(85.0, 100.0, 7.0, 1);
    pm.into()
}

#[test]
fn conncomp_reg() {
    let mut rp = RegParams::new("conncomp");
    let pix = page();

    let comps = find_connected_components(&pix, ConnectivityType::EightWay).unwrap();
    rp.compare_values(8.0, comps.len() as f64, 0.0);

    let markers = ComponentFilter::new()
        .side_range(10.0, 14.0)
        .max_aspect(1.4)
        .min_fill(0.85)
        .apply(&comps);
    rp.compare_values(4.0, markers.len() as f64, 0.0);
    for m in &markers {
        rp.compare_values(144.0, m.pixel_count as f64, 0.0);
    }

    let bubbles = ComponentFilter::new().max_fill(0.85).apply(&comps);
    rp.compare_values(4.0, bubbles.len() as f64, 0.0);
    let filled = bubbles.iter().filter(|c| c.fill_ratio() > 0.6).count();
    rp.compare_values(1.0, filled as f64, 0.0);

    assert!(rp.cleanup(), "conncomp regression test failed");
}
