#![warn(clippy::unwrap_used)]
use std::{path::PathBuf, time::Duration};

use clap::Parser;
use colorlayer::{Error, LayerConfig, Result};
use env_logger::{Env, TimestampPrecision};
use tileserver::tileapihandler;

#[derive(Parser, Debug)]
#[clap(name = "tileserver", about = "Serves the colorized tiles of a classified LERC image service")]
pub struct Opt {
    // set the listen addr
    #[clap(short = 'a', long = "addr")]
    pub addr: Option<String>,

    // set the listen port
    #[clap(short = 'p', long = "port", default_value = "4444")]
    pub port: u16,

    // json file with the layer configuration, the layer options are ignored when provided
    #[clap(long = "config")]
    pub config: Option<PathBuf>,

    // url of the image service
    #[clap(long = "url", env = "COLORLAYER_URL", default_value = "")]
    pub url: String,

    // access token appended to the image service requests
    #[clap(long = "token", env = "COLORLAYER_TOKEN")]
    pub token: Option<String>,

    #[clap(long = "tile-size", default_value_t = colorlayer::DEFAULT_TILE_SIZE)]
    pub tile_size: u32,

    #[clap(long = "opacity", default_value = "1.0")]
    pub opacity: f32,

    #[clap(long = "min-zoom", default_value = "0")]
    pub min_zoom: i32,

    #[clap(long = "max-zoom", default_value_t = colorlayer::DEFAULT_MAX_ZOOM)]
    pub max_zoom: i32,

    // do not wrap the tile columns around the antimeridian
    #[clap(long = "no-wrap")]
    pub no_wrap: bool,

    // timeout in seconds of the image service requests
    #[clap(long = "timeout", default_value = "30")]
    pub timeout: f64,
}

impl Opt {
    fn layer_config(&self) -> Result<LayerConfig> {
        if let Some(path) = &self.config {
            return LayerConfig::from_file(path);
        }

        let fetch_timeout = Duration::try_from_secs_f64(self.timeout)
            .map_err(|err| Error::InvalidArgument(format!("Invalid timeout {}: {err}", self.timeout)))?;

        Ok(LayerConfig {
            token: self.token.clone(),
            tile_size: self.tile_size,
            opacity: self.opacity,
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            no_wrap: self.no_wrap,
            fetch_timeout,
            ..LayerConfig::new(self.url.clone())
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    use std::str::FromStr;

    let opt = Opt::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let layer = match colorlayer::create_color_layer(opt.layer_config()?).await {
        Ok(layer) => layer,
        Err(err) => {
            log::error!("Failed to create the color layer: {err}");
            std::process::exit(1);
        }
    };

    let ip_addr = match opt.addr {
        Some(addr) => std::net::IpAddr::from_str(addr.as_str())
            .map_err(|err| Error::InvalidArgument(format!("Invalid ip address provided: {err}")))?,
        None => std::net::IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED),
    };

    let sock_addr = std::net::SocketAddr::from((ip_addr, opt.port));
    let router = tileapihandler::create_router(layer);
    let listener = tokio::net::TcpListener::bind(&sock_addr).await?;
    log::info!("Serving tiles on {sock_addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
