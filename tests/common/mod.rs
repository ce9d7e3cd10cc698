//! Shared fixtures: in-memory module archives, fake encryption gateways and a
//! mock resource host.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use hwmod::config::AppConfig;
use hwmod::context::AppContext;
use hwmod::core::{EncryptionGateway, Orchestrator};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

/// Build a ZIP archive from `(name, content)` pairs. Names ending in `/` become directories.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

/// Hand-assemble a STORED archive. Entries flagged `true` set general-purpose
/// bit 3: their local header carries zero sizes and a data descriptor follows
/// the data, as streaming zip writers produce.
pub fn build_descriptor_zip(entries: &[(&str, &[u8], bool)]) -> Vec<u8> {
    const DOS_DATE: u16 = 0x5021; // 2020-01-01
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data, descriptor) in entries {
        let offset = out.len() as u32;
        let crc = crc32fast::hash(data);
        let size = data.len() as u32;
        let flags: u16 = if *descriptor { 0x0008 } else { 0 };
        let (local_crc, local_size) = if *descriptor { (0, 0) } else { (crc, size) };

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&DOS_DATE.to_le_bytes());
        out.extend_from_slice(&local_crc.to_le_bytes());
        out.extend_from_slice(&local_size.to_le_bytes());
        out.extend_from_slice(&local_size.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);
        if *descriptor {
            out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
        }

        central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes());
        central.extend_from_slice(&flags.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes());
        central.extend_from_slice(&DOS_DATE.to_le_bytes());
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&size.to_le_bytes());
        central.extend_from_slice(&(name.len() as u16).to_le_bytes());
        central.extend_from_slice(&[0u8; 12]); // extra, comment, disk, internal/external attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name.as_bytes());
    }

    let cd_offset = out.len() as u32;
    let cd_size = central.len() as u32;
    let count = entries.len() as u16;
    out.extend_from_slice(&central);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Prefixes the plaintext with `enc:` and counts calls.
#[derive(Default)]
pub struct PrefixEncryption {
    pub calls: AtomicUsize,
}

impl PrefixEncryption {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EncryptionGateway for PrefixEncryption {
    async fn request_encryption(&self, plaintext: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("enc:{}", plaintext).into_bytes())
    }
}

/// Always fails, like a host whose encryption service is down.
pub struct FailingEncryption;

#[async_trait]
impl EncryptionGateway for FailingEncryption {
    async fn request_encryption(&self, _plaintext: &str) -> Result<Vec<u8>> {
        bail!("encryption service unavailable")
    }
}

pub fn orchestrator(base_url: &str, root: &Path) -> Orchestrator {
    Orchestrator::new(AppContext::new(AppConfig {
        module_resource_url: base_url.to_string(),
        module_root: root.to_path_buf(),
        ..Default::default()
    }))
}

pub async fn mount_archive(server: &MockServer, name: &str, version: &str, archive: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/files/module/{}", name, version)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/zip")
                .set_body_bytes(archive),
        )
        .mount(server)
        .await;
}

pub async fn mount_block(server: &MockServer, name: &str, version: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/{}/files/block/{}", name, version)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}
