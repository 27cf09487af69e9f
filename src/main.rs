use std::io::Write;

use eps::{Interpreter, RecordingDevice};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => anyhow::bail!("usage: eps <file.ps>"),
    };

    let source = std::fs::read(&path)?;

    let mut device = RecordingDevice::new();
    let mut interp = Interpreter::new(&source, &mut device);

    let outcome = interp.run();

    std::io::stdout().write_all(interp.stdout())?;

    if let Some(bbox) = interp.bounding_box() {
        log::info!(
            "bounding box: {} {} {} {}",
            bbox.lower_left_x,
            bbox.lower_left_y,
            bbox.upper_right_x,
            bbox.upper_right_y
        );
    }

    outcome
}
