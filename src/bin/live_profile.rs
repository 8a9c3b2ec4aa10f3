use std::process::ExitCode;
use std::time::Duration;

use log::{error, info};
use xicapture::cli::{parse_args, LiveCli};
use xicapture::config::adjust_packet_size;
use xicapture::display::{FrameView, NullView};
use xicapture::live::run_live;
use xicapture::{open_device, Camera, DefaultProvider};

const PACKET_SIZE_TIMEOUT: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    xicapture::init_logging();
    let cli: LiveCli = parse_args(std::env::args_os()).unwrap_or_else(|err| err.exit());
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{} Abort.", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &LiveCli) -> xicapture::Result<()> {
    let provider = DefaultProvider::default();
    let mut camera = open_device(&provider, cli.camera.camera_id.as_deref())?;
    adjust_packet_size(&mut camera, PACKET_SIZE_TIMEOUT);

    let mut view: Box<dyn FrameView> = if cli.no_display { Box::new(NullView) } else { window(cli)? };
    let mut acquisition = camera.start_acquisition()?;
    let shown = run_live(&mut acquisition, &cli.options(), view.as_mut());
    let shown = acquisition.finish(shown)?;
    info!("Showed {} frames", shown);
    Ok(())
}

#[cfg(feature = "highgui")]
fn window(_cli: &LiveCli) -> xicapture::Result<Box<dyn FrameView>> {
    Ok(Box::new(xicapture::display::HighGuiWindow::new("Live profile")?))
}

#[cfg(not(feature = "highgui"))]
fn window(cli: &LiveCli) -> xicapture::Result<Box<dyn FrameView>> {
    info!("Writing live panels to {}", cli.preview.display());
    Ok(Box::new(xicapture::display::PreviewFile::new(&cli.preview)))
}
