//! The `snapquip caption` command: pick a photo, request a caption, print it.

use clap::Args;
use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressStyle};
use snapquip_core::{
    CaptionFlow, CaptionOutcome, CaptionProviderFactory, CameraFrame, Config, FlowError,
    FlowEvent, FlowState, GalleryScan, ImageSelection, ImageSource, PathGallery,
};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

/// Arguments for the `caption` command.
#[derive(Args, Debug)]
pub struct CaptionArgs {
    /// Photo to caption (skips the interactive gallery pick)
    pub path: Option<PathBuf>,

    /// Read an already-captured frame from stdin instead of the gallery
    #[arg(long, conflicts_with = "path")]
    pub stdin: bool,

    /// Override the configured prompt for this run
    #[arg(long)]
    pub prompt: Option<String>,
}

/// Message shown while a request is outstanding.
const IN_FLIGHT_MESSAGE: &str = "Generating caption...";

/// Pure presenter: progress message while a request is outstanding,
/// otherwise the result text (empty before the first attempt).
pub fn render(state: &FlowState) -> String {
    if state.in_flight {
        IN_FLIGHT_MESSAGE.to_string()
    } else {
        state.display_text()
    }
}

/// Execute the caption command.
pub async fn execute(args: CaptionArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(prompt) = args.prompt.clone() {
        config.captioner.prompt = prompt;
    }

    let provider = CaptionProviderFactory::create(&config.captioner)?;
    if !provider.is_available().await {
        tracing::warn!(
            "Captioning provider '{}' looks unavailable; attempting anyway",
            provider.name()
        );
    }

    let source = build_source(&args, &config)?;
    tracing::debug!("Acquiring photo from {}", source.name());

    let state = FlowState::default();
    let state = match source.acquire().await? {
        Some(selection) => state.apply(FlowEvent::Selected(selection)),
        None => {
            eprintln!("No photo selected.");
            return Ok(());
        }
    };

    let flow = CaptionFlow::new(provider, &config.captioner, config.limits.clone());

    let spinner = progress_spinner();
    let state = flow.submit(&state).await;
    spinner.finish_and_clear();

    present(&state);
    Ok(())
}

/// Choose the image source from the CLI arguments.
fn build_source(args: &CaptionArgs, config: &Config) -> anyhow::Result<Box<dyn ImageSource>> {
    if args.stdin {
        let mut bytes = Vec::new();
        std::io::stdin().read_to_end(&mut bytes)?;
        Ok(Box::new(CameraFrame::new(bytes)))
    } else if let Some(path) = &args.path {
        Ok(Box::new(PathGallery::new(path.clone())))
    } else {
        Ok(Box::new(InteractiveGallery::new(GalleryScan::new(
            config.gallery_dir(),
            &config.gallery.extensions,
        ))))
    }
}

/// Print the settled state: caption to stdout, failures in red.
fn present(state: &FlowState) {
    let text = render(state);
    match &state.result {
        Some(CaptionOutcome::Failure(_)) => println!("{}", style(text).red()),
        _ if text.is_empty() => eprintln!("{}", style("(no caption returned)").dim()),
        _ => println!("{text}"),
    }
}

/// Spinner shown while the request is in flight. Drawn on stderr so stdout
/// stays clean for the caption.
fn progress_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(IN_FLIGHT_MESSAGE);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Gallery pick backed by an interactive terminal prompt.
struct InteractiveGallery {
    scan: GalleryScan,
}

impl InteractiveGallery {
    fn new(scan: GalleryScan) -> Self {
        Self { scan }
    }
}

#[async_trait::async_trait]
impl ImageSource for InteractiveGallery {
    fn name(&self) -> &str {
        "gallery"
    }

    async fn acquire(&self) -> Result<Option<ImageSelection>, FlowError> {
        let entries = self.scan.entries()?;
        if entries.is_empty() {
            return Err(FlowError::Source(format!(
                "No images found in {}",
                self.scan.dir().display()
            )));
        }

        let labels: Vec<String> = entries
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();

        // dialoguer blocks on the terminal; keep it off the runtime threads.
        let choice = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt("Pick a photo")
                .items(&labels)
                .default(0)
                .interact_opt()
        })
        .await
        .map_err(|e| FlowError::Source(format!("Gallery prompt task failed: {e}")))?;

        match choice {
            Ok(Some(index)) => Ok(Some(ImageSelection::Gallery(entries[index].clone()))),
            // Esc cancels; Ctrl+C surfaces as an interrupted I/O error.
            Ok(None) => Ok(None),
            Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => {
                Ok(None)
            }
            Err(e) => Err(FlowError::Source(format!("Gallery prompt failed: {e}"))),
        }
    }
}
