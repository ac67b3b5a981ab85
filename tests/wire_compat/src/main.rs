fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use serde::Deserialize;

    use filepush_protocol::wire::{
        read_checksum, read_header, read_payload, read_resume_offset, read_verdict,
        write_checksum, write_header, write_resume_offset, write_verdict,
    };
    use filepush_protocol::{TransferHeader, Verdict, digest_hex, md5_bytes};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads and deserializes a fixture file.
    fn load_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn bytes(hex_str: &str) -> Vec<u8> {
        hex::decode(hex_str).unwrap_or_else(|e| panic!("bad hex in fixture: {e}"))
    }

    #[derive(Deserialize)]
    struct HeaderCase {
        case: String,
        filename: String,
        file_size: u64,
        frame_hex: String,
    }

    #[derive(Deserialize)]
    struct OffsetCase {
        offset: u64,
        frame_hex: String,
    }

    #[derive(Deserialize)]
    struct VerdictCase {
        verdict: String,
        frame_hex: String,
    }

    #[derive(Deserialize)]
    struct ChecksumCase {
        content: String,
        md5_hex: String,
    }

    #[derive(Deserialize)]
    struct SessionCase {
        case: String,
        filename: String,
        content: String,
        resume_offset: u64,
        client_hex: String,
        server_hex: String,
    }

    #[derive(Deserialize)]
    struct MalformedCase {
        case: String,
        frame: String,
        frame_hex: String,
    }

    // --- Frame encoding ---

    #[tokio::test]
    async fn fixture_headers() {
        for c in load_fixture::<Vec<HeaderCase>>("headers.json") {
            let header = TransferHeader {
                filename: c.filename.clone(),
                file_size: c.file_size,
            };
            let expected = bytes(&c.frame_hex);

            let mut encoded = Vec::new();
            write_header(&mut encoded, &header).await.unwrap();
            assert_eq!(encoded, expected, "encode mismatch for {}", c.case);

            let decoded = read_header(&mut expected.as_slice()).await.unwrap();
            assert_eq!(decoded, header, "decode mismatch for {}", c.case);
        }
    }

    #[tokio::test]
    async fn fixture_resume_offsets() {
        for c in load_fixture::<Vec<OffsetCase>>("resume_offsets.json") {
            let expected = bytes(&c.frame_hex);

            let mut encoded = Vec::new();
            write_resume_offset(&mut encoded, c.offset).await.unwrap();
            assert_eq!(encoded, expected, "encode mismatch for offset {}", c.offset);

            let decoded = read_resume_offset(&mut expected.as_slice()).await.unwrap();
            assert_eq!(decoded, c.offset);
        }
    }

    #[tokio::test]
    async fn fixture_verdicts() {
        for c in load_fixture::<Vec<VerdictCase>>("verdicts.json") {
            let verdict = match c.verdict.as_str() {
                "accept" => Verdict::Accept,
                "reject" => Verdict::Reject,
                other => panic!("unknown verdict in fixture: {other}"),
            };
            let expected = bytes(&c.frame_hex);

            let mut encoded = Vec::new();
            write_verdict(&mut encoded, verdict).await.unwrap();
            assert_eq!(encoded, expected, "encode mismatch for {}", c.verdict);

            let decoded = read_verdict(&mut expected.as_slice()).await.unwrap();
            assert_eq!(decoded, verdict);
        }
    }

    #[tokio::test]
    async fn fixture_checksums() {
        for c in load_fixture::<Vec<ChecksumCase>>("checksums.json") {
            let digest = md5_bytes(c.content.as_bytes());
            assert_eq!(digest_hex(&digest), c.md5_hex, "digest of {:?}", c.content);

            // The checksum frame is the raw digest, not its hex form.
            let mut encoded = Vec::new();
            write_checksum(&mut encoded, &digest).await.unwrap();
            assert_eq!(encoded, bytes(&c.md5_hex));
            assert_eq!(read_checksum(&mut encoded.as_slice()).await.unwrap(), digest);
        }
    }

    // --- Whole exchanges ---

    #[tokio::test]
    async fn fixture_sessions_encode() {
        for c in load_fixture::<Vec<SessionCase>>("sessions.json") {
            let content = c.content.as_bytes();
            let header = TransferHeader {
                filename: c.filename.clone(),
                file_size: content.len() as u64,
            };

            let mut client = Vec::new();
            write_header(&mut client, &header).await.unwrap();
            client.extend_from_slice(&content[c.resume_offset as usize..]);
            write_checksum(&mut client, &md5_bytes(content)).await.unwrap();
            assert_eq!(hex::encode(&client), c.client_hex, "client stream for {}", c.case);

            let mut server = Vec::new();
            write_resume_offset(&mut server, c.resume_offset).await.unwrap();
            write_verdict(&mut server, Verdict::Accept).await.unwrap();
            assert_eq!(hex::encode(&server), c.server_hex, "server stream for {}", c.case);
        }
    }

    #[tokio::test]
    async fn fixture_sessions_decode() {
        for c in load_fixture::<Vec<SessionCase>>("sessions.json") {
            let client = bytes(&c.client_hex);
            let server = bytes(&c.server_hex);
            let mut client = client.as_slice();
            let mut server = server.as_slice();

            let header = read_header(&mut client).await.unwrap();
            assert_eq!(header.filename, c.filename);

            let offset = read_resume_offset(&mut server).await.unwrap();
            assert_eq!(offset, c.resume_offset);

            // Rebuild the destination the way a receiver would: existing
            // prefix plus the streamed remainder.
            let mut file = c.content.as_bytes()[..offset as usize].to_vec();
            let mut buf = [0u8; 7];
            let received = read_payload(
                &mut client,
                &mut file,
                header.file_size - offset,
                &mut buf,
                Duration::from_secs(1),
                |_| {},
            )
            .await
            .unwrap();
            assert_eq!(received, header.file_size - offset);

            let expected = read_checksum(&mut client).await.unwrap();
            assert_eq!(md5_bytes(&file), expected, "checksum for {}", c.case);
            assert!(client.is_empty(), "trailing client bytes in {}", c.case);

            assert_eq!(read_verdict(&mut server).await.unwrap(), Verdict::Accept);
            assert!(server.is_empty());
        }
    }

    // --- Malformed input ---

    #[tokio::test]
    async fn fixture_malformed_frames_rejected() {
        for c in load_fixture::<Vec<MalformedCase>>("malformed.json") {
            let frame = bytes(&c.frame_hex);
            let mut input = frame.as_slice();
            let failed = match c.frame.as_str() {
                "header" => read_header(&mut input).await.is_err(),
                "resume_offset" => read_resume_offset(&mut input).await.is_err(),
                "checksum" => read_checksum(&mut input).await.is_err(),
                "verdict" => read_verdict(&mut input).await.is_err(),
                other => panic!("unknown frame kind in fixture: {other}"),
            };
            assert!(failed, "{} decoded without error", c.case);
        }
    }
}
