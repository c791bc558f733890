use std::path::PathBuf;

use base64::Engine as _;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use evidence_anchor::blockchain::recover_attestation_signer;
use evidence_anchor::evidence::canonical::hash_value;
use evidence_anchor::evidence::{canonicalize, hash, AnchorPayload, EvidenceHash, EvidenceRecord, EvidenceType};

#[derive(Parser)]
#[command(name = "anchor-cli")]
#[command(about = "Management CLI for the evidence anchoring service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000", env = "EVIDENCE_ANCHOR_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the evidence hash and payload offline
    Hash {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long = "type", default_value = "document")]
        evidence_type: String,
        #[arg(long, default_value = "user_upload")]
        source: String,
        #[arg(long, default_value = "user")]
        uploader: String,
        /// RFC 3339 instant; defaults to now
        #[arg(long)]
        timestamp: Option<String>,
        /// Also print the canonical text that was hashed
        #[arg(long)]
        show_canonical: bool,
    },
    /// Extract the evidence hash from a transaction data field
    Decode { data_hex: String },
    /// Recover the signer of an attestation signature
    Verify {
        #[arg(long)]
        hash: String,
        #[arg(long)]
        timestamp: String,
        #[arg(long)]
        signature: String,
        /// Fail unless the signer is this address
        #[arg(long)]
        expected: Option<String>,
    },
    /// Re-hash the evidence_data of a saved anchoring result
    Rehash { result_file: PathBuf },
    /// Anchor text evidence through the service
    Submit {
        #[arg(long)]
        content: String,
        #[arg(long = "type", default_value = "document")]
        evidence_type: String,
        #[arg(long, default_value = "cli")]
        source: String,
        #[arg(long)]
        uploader_address: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Hash {
            content,
            file,
            evidence_type,
            source,
            uploader,
            timestamp,
            show_canonical,
        } => {
            let mut kind: EvidenceType = evidence_type.parse()?;
            let content = match (content, file) {
                (Some(text), _) => text,
                (None, Some(path)) => match String::from_utf8(std::fs::read(&path)?) {
                    Ok(text) => text,
                    Err(e) => {
                        kind = EvidenceType::Binary;
                        base64::engine::general_purpose::STANDARD.encode(e.into_bytes())
                    }
                },
                (None, None) => return Err("either --content or --file is required".into()),
            };

            let mut record = EvidenceRecord::new(content.trim(), kind, source).with_uploader(uploader);
            if let Some(ts) = timestamp {
                record = record.with_timestamp(DateTime::parse_from_rfc3339(&ts)?.with_timezone(&Utc));
            }
            record.validate()?;

            let evidence_hash = hash(&record);
            let mut out = json!({
                "evidence_hash": evidence_hash,
                "data_hex": AnchorPayload::build(&evidence_hash).to_data_hex(),
                "evidence_data": record,
            });
            if show_canonical {
                out["canonical"] = Value::String(String::from_utf8(canonicalize(&record))?);
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Decode { data_hex } => {
            let payload = AnchorPayload::from_data_hex(&data_hex)?;
            println!("{}", payload.evidence_hash());
        }
        Commands::Verify {
            hash,
            timestamp,
            signature,
            expected,
        } => {
            let evidence_hash: EvidenceHash = hash.parse()?;
            let signer = recover_attestation_signer(&evidence_hash, &timestamp, &signature)?;
            println!("{signer}");
            if let Some(expected) = expected {
                if !expected.eq_ignore_ascii_case(&signer.to_string()) {
                    eprintln!("Error: signature was made by {signer}, not {expected}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Rehash { result_file } => {
            let result: Value = serde_json::from_str(&std::fs::read_to_string(result_file)?)?;
            let result = result.get("result").unwrap_or(&result);
            let data = result.get("evidence_data").ok_or("result has no evidence_data")?;
            let computed = hash_value(data);
            println!("{computed}");
            if let Some(recorded) = result.get("evidence_hash").and_then(Value::as_str) {
                if recorded != computed.to_hex() {
                    eprintln!("Error: recorded evidence_hash {recorded} does not match");
                    std::process::exit(1);
                }
            }
        }
        Commands::Submit {
            content,
            evidence_type,
            source,
            uploader_address,
            description,
        } => {
            let body = json!({
                "content": content,
                "type": evidence_type,
                "source": source,
                "uploader_address": uploader_address,
                "description": description,
            });
            let res = reqwest::Client::new()
                .post(format!("{}/api/evidence", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = reqwest::get(format!("{}/api/health", cli.url)).await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    if !status.is_success() {
        eprintln!("Error: service returned status {status}");
        std::process::exit(1);
    }
    Ok(())
}
