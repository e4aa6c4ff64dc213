// Payloads captured from real client databases. These pin the wire formats
// the decoders must stay compatible with.

use ferry_codec::{
    decode_compressed_content, decode_extension, decode_quoted_message, decode_sender_id,
    decode_stored_message, parse_quoted_message, CodecError, ExtensionValue, StoredMessage,
};

const BYTES_EXTRA: &str = "CgQIEBAAGhcIARITd3hpZF9rZjd6YnlqanhzOHIyMhqBAwgHEvwCPG1zZ3NvdXJjZT4KICAgIDxhdHVzZXJsaXN0PgogICAgICAgIDwhW0NEQVRBWyx3eGlkX21zODBpbHk1Nnk0bjIxXV0+CiAgICA8L2F0dXNlcmxpc3Q+CiAgICA8cHVhPjE8L3B1YT4KICAgIDxzaWxlbmNlPjE8L3NpbGVuY2U+CiAgICA8bWVtYmVyY291bnQ+ODwvbWVtYmVyY291bnQ+CiAgICA8c2lnbmF0dXJlPlYxX3gyUHNvSnVDfHYxX3gyUHNvSnVDPC9zaWduYXR1cmU+CiAgICA8dG1wX25vZGU+CiAgICAgICAgPHB1Ymxpc2hlci1pZCAvPgogICAgPC90bXBfbm9kZT4KICAgIDxzZWNfbXNnX25vZGU+CiAgICAgICAgPGFsbm9kZT4KICAgICAgICAgICAgPGZyPjE8L2ZyPgogICAgICAgIDwvYWxub2RlPgogICAgPC9zZWNfbXNnX25vZGU+CjwvbXNnc291cmNlPgoaJAgCEiBhODlkYTMwMzE5ZGVmYWY0OWUyMjhhYWI5ZjU5NmU5NA==";

const COMPRESSED_QUOTE: &str = "8js8P3htbCB2ZXJzaW9uPSIxLjAiPz4KPG1zZz4KCTxhcHBtc2cgYXBwaWQ9IiIgc2RrdmVyPSIwIj4KCQk8dGl0bGU+cHJvdG88Lw0AABcAUWRlcyAvIQDTYWN0aW9uPnZpZXc8Lw0AACIAkXR5cGU+NTc8LwkAABIAQXNob3cNADUwPC8MAAAZAHNjb250ZW50UQAzdXJsCgBGZGF0YQ4AOWxvdw0ACh4Ao3JlY29yZGl0ZW09AFZ0aHVtYjEAcm1lc3NhZ2WhAAMjAHNsYW5pbmZvDgBScmVmZXIVAQD4AAC/ABYxvgDwCwk8c3ZyaWQ+Mjk1OTkzMzgxMTYyODQwMTE2zgABGwABOAD0D2Zyb211c3I+MjU1Njk4ODY5ODVAY2hhdHJvb208Lx4AASsAABcAACsA9AZ3eGlkX21zODBpbHk1Nnk0bjIxPC8dAAIqAPcHcmVhdGV0aW1lPjE3MzgyMzcyOTI8LxcAAScA+BFkaXNwbGF5bmFtZT7lvLrlk6XlpKflj7fnsonkuJ08LyAAATEA5W1zZ3NvdXJjZT4mbHQ7DgCQJmd0OwogICAgFgBWYWxub2QTAAACAAAXACBmchMAEDELABIvDAAFMgAbLzMAACQAUnNpbGVuWgACNAAHEQAFOQCwbWVtYmVyY291bnRdABA4OQAbLxUABS0AgXNpZ25hdHVymwDWVjFfNVdkYXdybnB8dgwAAUEACSkABT8AT3RtcF/ZAALgcHVibGlzaGVyLWlkIC+IAAU0AB0vNQAAYQB/c2VjX21zZ04AAwsLAQQCAAA4AAI2AQIOAQIMAAFpAAACAAAfAA9GAQEdL2wAASoACrkBFjwQAAChAwVfA5M+5LiA5qC3PC9vAwAdACg8L/YCRzxleHQRAwIbAkB1c2VyUgIDJgMCFQAHSgIDGAB2Y29tbWVudHEDkGFwcGF0dGFjaGgA5Qk8dG90YWxsZW4+MDwvDAABhQICJgAAbQECKgDoZW1vdGljb25tZDU+PC8OAAEvAGNmaWxlZXgtBLMJPGFlc2tleT48LwkAAdUACXwAQDx3ZWKeBGJzaGFyZWRkAAXlARVJdwAFEwBQUmVxSWSnAAsSAAFaAA1MADA8d2U7BTNuZm9aAHRhZ2VwYXRoVwAKPwEBFwEG6wCkYXBwc2VydmljZRgFCxIAA3QAB2IAAM4AUnNlYXJjYgABMgACtQQSPF0EAq4BAlUE5GtmN3pieWpqeHM4cjIyfwQDIgByCgk8c2Nlbo8FAQkAEQqSAAACAgDMABM8MgZEPjE8LwsAAJAANWFwcBACAX8AAzEACwMCgDwvbXNnPgoA";

#[test]
fn extension_sample_decodes_all_fields() {
    let decoded = decode_extension(BYTES_EXTRA).unwrap();
    assert_eq!(decoded["16"], ExtensionValue::Int(0));
    assert_eq!(
        decoded["1"],
        ExtensionValue::Text("wxid_kf7zbyjjxs8r22".into())
    );
    assert_eq!(
        decoded["2"],
        ExtensionValue::Text("a89da30319defaf49e228aab9f596e94".into())
    );
    match &decoded["7"] {
        ExtensionValue::Text(source) => assert!(source.starts_with("<msgsource>")),
        other => panic!("expected msgsource text, got {other:?}"),
    }
}

#[test]
fn extension_sample_sender() {
    assert_eq!(decode_sender_id(BYTES_EXTRA).unwrap(), "wxid_kf7zbyjjxs8r22");
}

#[test]
fn truncated_extension_sample_is_decode_error() {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(BYTES_EXTRA)
        .unwrap();
    for cut in [7usize, 20, 100, bytes.len() - 1] {
        assert!(
            matches!(decode_extension(&bytes[..cut]), Err(CodecError::Decode(_))),
            "cut at {cut} should fail"
        );
    }
}

#[test]
fn compressed_sample_decompresses_without_padding() {
    let text = decode_compressed_content(COMPRESSED_QUOTE).unwrap();
    assert!(text.starts_with("<?xml version=\"1.0\"?>\n<msg>"));
    assert!(text.ends_with("</msg>\n"));
    assert!(!text.contains('\0'));
    assert!(text.contains("&lt;msgsource&gt;"));
}

#[test]
fn compressed_sample_is_a_quote() {
    let quote = decode_quoted_message(COMPRESSED_QUOTE).unwrap();
    assert_eq!(quote.content, "proto");
    assert_eq!(quote.sender, "wxid_kf7zbyjjxs8r22");
    assert_eq!(quote.referred_sender, "wxid_ms80ily56y4n21");
    assert_eq!(quote.referred_text, "一样");
}

#[test]
fn already_decompressed_body_parses_directly() {
    let markup = decode_compressed_content(COMPRESSED_QUOTE).unwrap();
    let quote = parse_quoted_message(&markup).unwrap();
    assert_eq!(quote.content, "proto");
}

#[test]
fn stored_group_quote_row() {
    let row = StoredMessage {
        is_sender: 0,
        bytes_extra: BYTES_EXTRA.into(),
        compress_content: COMPRESSED_QUOTE.into(),
        str_content: String::new(),
        msg_type: 49,
        sub_type: 57,
        create_time: 1_738_237_300,
    };
    let decoded = decode_stored_message(&row, "25569886985@chatroom", "wxid_bot")
        .unwrap()
        .unwrap();
    assert_eq!(decoded.sender, "wxid_kf7zbyjjxs8r22");
    assert_eq!(decoded.text, "proto");
    assert_eq!(decoded.timestamp, 1_738_237_300);
}
