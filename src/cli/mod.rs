//! CLI module for mdsite

mod args;

pub use args::{Args, Command};

use crate::config::{CliOverrides, Config, DEFAULT_CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::HtmlGenerator;
use crate::paths::DocumentPath;
use crate::source::DirectorySource;
use percent_encoding::percent_decode_str;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Run the CLI application
pub fn run() -> ExitCode {
    let args = Args::parse_args();
    init_tracing(args.verbose());

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `-v` enables debug logs for this crate; otherwise `RUST_LOG` or warnings only
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mdsite=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    // stdout is reserved for command output such as `nav` JSON
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute(args: Args) -> Result<()> {
    match args.command {
        Command::Build {
            input,
            output,
            config,
            home,
            page_extension,
            prefixes,
            exclude,
            jobs,
            clean,
            verbose,
        } => {
            let mut cfg = load_config(config.as_deref())?;

            // CLI takes precedence over the config file
            cfg.merge_cli(CliOverrides {
                output,
                exclude,
                prefixes,
                page_extension,
                home,
                jobs,
                clean,
            });
            cfg.validate()?;

            info!(
                input = %input.display(),
                output = %cfg.output.directory.display(),
                prefixes = ?cfg.links.prefixes,
                ext = %cfg.links.page_extension,
                "building site"
            );

            let source = DirectorySource::new(&input)?.with_exclude(&cfg.content.exclude)?;

            println!("Rendering {} ...", input.display());
            let generator = HtmlGenerator::from_config(&cfg)?.with_progress(verbose);
            let report = generator.generate(&source)?;

            println!("{}", report.summary());
            for (page, target) in &report.dangling_links {
                println!("  dangling link: {} -> {}", page, target);
            }
            println!("Site written to: {}", generator.output_dir().display());

            Ok(())
        }

        Command::Serve { path, port, page_extension } => {
            if !path.exists() {
                return Err(Error::PathNotFound(path));
            }

            println!("Serving {} on http://localhost:{}", path.display(), port);
            println!("Press Ctrl+C to stop");

            serve_directory(&path, port, page_extension.trim_start_matches('.'))?;

            Ok(())
        }

        Command::Nav { current, config } => {
            let cfg = load_config(config.as_deref())?;
            cfg.validate()?;

            let current = DocumentPath::parse(&current)?;
            let nav = cfg
                .navigation_tree()?
                .resolve(&current, &cfg.links.page_extension);

            if nav.current().is_none() {
                warn!(current = %current, "document is not part of the navigation");
            }

            println!("{}", serde_json::to_string_pretty(&nav)?);
            Ok(())
        }

        Command::Version => {
            println!("mdsite {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Config from `--config`, else `mdsite.toml` in the working directory if present
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

/// Simple HTTP server for serving static files
fn serve_directory(root: &Path, port: u16, page_extension: &str) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
        .map_err(|e| Error::Other(format!("Failed to bind to port {}: {}", port, e)))?;

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let root = root.to_path_buf();
                let page_extension = page_extension.to_string();
                std::thread::spawn(move || {
                    if let Err(e) = handle_request(stream, &root, &page_extension) {
                        warn!(error = %e, "request failed");
                    }
                });
            }
            Err(e) => warn!(error = %e, "connection failed"),
        }
    }

    Ok(())
}

/// Handle a single HTTP request
fn handle_request(mut stream: TcpStream, root: &Path, page_extension: &str) -> Result<()> {
    let mut buffer = [0; 4096];
    let n = stream.read(&mut buffer)?;
    let request = String::from_utf8_lossy(&buffer[..n]);

    let request_line = request.lines().next().unwrap_or("");
    let parts: Vec<&str> = request_line.split_whitespace().collect();

    if parts.len() < 2 {
        send_response(&mut stream, 400, "Bad Request", "text/plain", b"Bad Request")?;
        return Ok(());
    }

    let method = parts[0];
    let target = parts[1];

    if method != "GET" {
        send_response(&mut stream, 405, "Method Not Allowed", "text/plain", b"Method Not Allowed")?;
        return Ok(());
    }

    let Some(file_path) = resolve_request_path(root, &decode_url_path(target), page_extension) else {
        send_response(&mut stream, 404, "Not Found", "text/plain", b"Not Found")?;
        return Ok(());
    };

    // Prevent path traversal
    let root_canonical = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    if !file_path.starts_with(&root_canonical) {
        send_response(&mut stream, 403, "Forbidden", "text/plain", b"Forbidden")?;
        return Ok(());
    }

    match std::fs::read(&file_path) {
        Ok(content) => {
            let content_type = guess_content_type(&file_path);
            send_response(&mut stream, 200, "OK", content_type, &content)?;
            info!("200 {} {}", method, target);
        }
        Err(_) => {
            send_response(&mut stream, 404, "Not Found", "text/plain", b"Not Found")?;
            info!("404 {} {}", method, target);
        }
    }

    Ok(())
}

/// Canonical file for a decoded URL path; directories map to their
/// `index.<page_extension>` page
fn resolve_request_path(root: &Path, url_path: &str, page_extension: &str) -> Option<PathBuf> {
    let index = format!("index.{}", page_extension);
    let relative = url_path.trim_start_matches('/');

    let candidate = if relative.is_empty() {
        root.join(&index)
    } else {
        root.join(relative)
    };

    let canonical = candidate.canonicalize().ok()?;
    if canonical.is_dir() {
        let index_path = canonical.join(&index);
        debug!(dir = %canonical.display(), "serving directory index");
        return Some(index_path);
    }
    Some(canonical)
}

/// Send an HTTP response
fn send_response(
    stream: &mut TcpStream,
    status_code: u16,
    status_text: &str,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status_code,
        status_text,
        content_type,
        body.len()
    );

    stream.write_all(response.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()?;

    Ok(())
}

/// Guess content type from file extension
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") | Some("xhtml") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Strip query and fragment, then percent-decode
fn decode_url_path(s: &str) -> String {
    let path = s.split(['?', '#']).next().unwrap_or(s);
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
