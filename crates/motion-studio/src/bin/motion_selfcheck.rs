use std::path::Path;

use motion_media::{check_ffmpeg, choose_container, FfmpegRunner};
use motion_studio::StudioConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = StudioConfig::from_env();

    println!(
        "motion-selfcheck: starting with work_dir={}",
        config.work_dir.display()
    );
    ensure_workdir(&config.work_dir).await?;
    ensure_video_encoder().await?;
    ensure_env_present(&["GEMINI_API_KEY"])?;

    if std::env::var("GEMINI_UPSCALE_API_KEY").is_err() {
        println!("motion-selfcheck: GEMINI_UPSCALE_API_KEY not set, upscaling disabled");
    }

    println!("motion-selfcheck: ok");
    Ok(())
}

async fn ensure_workdir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

async fn ensure_video_encoder() -> anyhow::Result<()> {
    let ffmpeg = check_ffmpeg().map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;
    let encoders = FfmpegRunner::new().list_encoders().await?;

    let container = choose_container(&encoders)
        .ok_or_else(|| {
            anyhow::anyhow!("ffmpeg at {} has neither VP9 nor H.264", ffmpeg.display())
        })?;
    println!(
        "motion-selfcheck: exports will use {} ({})",
        container.extension(),
        container.encoder()
    );
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
