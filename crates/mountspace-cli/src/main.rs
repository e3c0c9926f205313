//! mountspace command-line front end.
//!
//! Composes a virtual file system from a RON manifest and runs one operation
//! against it.
//!
//! Usage:
//!   mountspace --manifest mounts.ron mounts
//!   mountspace --manifest mounts.ron ls /data/ --long
//!   mountspace --manifest mounts.ron cat /about/README.md
//!   echo hi | mountspace --manifest mounts.ron put /data/ hello.txt
//!
//! Logging goes to stderr; set `RUST_LOG=mountspace_vfs=trace` to watch
//! dispatch decisions.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use mountspace_types::{BackendId, FileIdentifier, FolderIdentifier};
use mountspace_vfs::{MountManifest, ResourceBackend, VirtualFileSystem, path};

/// Query and modify a virtual file system described by a mount manifest.
#[derive(Parser, Debug)]
#[command(name = "mountspace")]
#[command(about = "Unified namespace over disk folders and embedded bundles")]
struct Args {
    /// Mount manifest (RON)
    #[arg(short, long, default_value = "mounts.ron")]
    manifest: PathBuf,

    /// Print listings, metadata and mounts as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every mount
    Mounts,
    /// List a folder (the aggregate root by default)
    Ls {
        folder: Option<String>,
        /// Include file sizes
        #[arg(short, long)]
        long: bool,
    },
    /// Write a file's contents to stdout
    Cat { file: String },
    /// Show a file's metadata
    Stat { file: String },
    /// Create a file from a local file, or from stdin
    Put {
        folder: String,
        name: String,
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Create a folder
    Mkdir { parent: String, name: String },
    /// Delete a folder and everything in it
    Rmdir { folder: String },
    /// Delete a file
    Rm { file: String },
    /// Show the naming rules enforced by read-write mounts
    Rules,
}

/// Bundles compiled into this binary, addressable from manifests by name.
fn builtin_bundles() -> Result<HashMap<String, ResourceBackend>> {
    let about = ResourceBackend::manifest(
        BackendId::new("about")?,
        [
            ("README.md", include_bytes!("../assets/about.md").as_slice()),
            ("example.ron", include_bytes!("../assets/example.ron").as_slice()),
        ],
    )?;
    Ok(HashMap::from([("about".to_string(), about)]))
}

fn folder_arg(vfs: &VirtualFileSystem, arg: Option<&str>) -> FolderIdentifier {
    match arg {
        Some(p) => FolderIdentifier::new(vfs.id().clone(), path::folder_form(p, vfs.separator())),
        None => vfs.get_root(),
    }
}

fn file_arg(vfs: &VirtualFileSystem, arg: &str) -> FileIdentifier {
    let sep = vfs.separator();
    let file = if arg.starts_with(sep) {
        arg.to_string()
    } else {
        format!("{sep}{arg}")
    };
    FileIdentifier::new(vfs.id().clone(), file)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    debug!(manifest = %args.manifest.display(), command = ?args.command, "starting");

    let manifest = MountManifest::load(&args.manifest)
        .with_context(|| format!("loading {}", args.manifest.display()))?;
    let vfs = manifest
        .into_builder(&builtin_bundles()?)?
        .build()
        .context("building the virtual file system")?;

    debug!(id = %vfs.id(), root = %vfs.get_root().folder, "file system ready");
    run(&vfs, args.command, args.json).await
}

async fn run(vfs: &VirtualFileSystem, command: Command, as_json: bool) -> Result<()> {
    match command {
        Command::Mounts => {
            let mounts = vfs.mounts();
            if as_json {
                println!("{}", serde_json::to_string_pretty(&mounts)?);
            } else {
                for m in mounts {
                    println!(
                        "{:<24} {:<10} {:<8} {}",
                        m.root.as_str(),
                        m.capability.to_string(),
                        m.kind,
                        m.backend
                    );
                }
            }
        }

        Command::Ls { folder, long } => {
            let target = folder_arg(vfs, folder.as_deref());
            let folders = vfs
                .folder_identifiers(&target)
                .await
                .with_context(|| format!("listing folders of {}", target.folder))?;
            let files = vfs
                .file_identifiers(&target)
                .await
                .with_context(|| format!("listing files of {}", target.folder))?;

            let sizes = if long {
                let metas =
                    futures::future::try_join_all(files.iter().map(|f| vfs.metadata(f))).await?;
                metas.into_iter().map(|m| Some(m.size)).collect()
            } else {
                vec![None; files.len()]
            };

            if as_json {
                let files: Vec<_> = files
                    .iter()
                    .zip(&sizes)
                    .map(|(f, size)| json!({ "file": f.file, "size": size }))
                    .collect();
                let folders: Vec<_> = folders.iter().map(|f| &f.folder).collect();
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({ "folders": folders, "files": files }))?
                );
            } else {
                for f in &folders {
                    println!("{}", f.folder);
                }
                for (f, size) in files.iter().zip(&sizes) {
                    match size {
                        Some(size) => println!("{:>10}  {}", size, f.file),
                        None => println!("{}", f.file),
                    }
                }
            }
        }

        Command::Cat { file } => {
            let file = file_arg(vfs, &file);
            let mut reader = vfs
                .open_read(&file)
                .await
                .with_context(|| format!("opening {}", file.file))?;
            let mut stdout = tokio::io::stdout();
            tokio::io::copy(&mut reader, &mut stdout).await?;
            stdout.flush().await?;
        }

        Command::Stat { file } => {
            let file = file_arg(vfs, &file);
            let meta = vfs
                .metadata(&file)
                .await
                .with_context(|| format!("reading metadata of {}", file.file))?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&meta)?);
            } else {
                println!("file:     {}", meta.file.file);
                println!("name:     {}", meta.name);
                println!("size:     {}", meta.size);
                if let Some(modified) = meta.modified {
                    println!("modified: {modified:?}");
                }
            }
        }

        Command::Put { folder, name, from } => {
            let target = folder_arg(vfs, Some(&folder));
            let created = match from {
                Some(local) => {
                    let mut src = tokio::fs::File::open(&local)
                        .await
                        .with_context(|| format!("opening {}", local.display()))?;
                    vfs.create_file(&target, &name, &mut src).await?
                }
                None => {
                    let mut stdin = tokio::io::stdin();
                    vfs.create_file(&target, &name, &mut stdin).await?
                }
            };
            println!("{}", created.file);
        }

        Command::Mkdir { parent, name } => {
            let parent = folder_arg(vfs, Some(&parent));
            let created = vfs.create_folder(&parent, &name).await?;
            println!("{}", created.folder);
        }

        Command::Rmdir { folder } => {
            let folder = folder_arg(vfs, Some(&folder));
            vfs.delete_folder(&folder).await?;
        }

        Command::Rm { file } => {
            let file = file_arg(vfs, &file);
            vfs.delete_file(&file).await?;
        }

        Command::Rules => {
            let rules = vfs.naming_rules();
            if as_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "invalid_path_chars": rules.invalid_path_chars,
                        "invalid_file_name_chars": rules.invalid_file_name_chars,
                        "reserved_names": rules.reserved_names,
                    }))?
                );
            } else {
                let show = |chars: &[char]| -> String {
                    chars.iter().map(|c| format!("{c:?}")).collect::<Vec<_>>().join(" ")
                };
                println!("invalid path chars:      {}", show(&rules.invalid_path_chars));
                println!("invalid file name chars: {}", show(&rules.invalid_file_name_chars));
                println!("reserved names:          {}", rules.reserved_names.join(" "));
            }
        }
    }
    Ok(())
}
