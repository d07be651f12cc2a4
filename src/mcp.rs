//! Stdio JSON-RPC server exposing the analysis engine as MCP tools.
//!
//! Reads one request per line from the input stream and writes one response
//! per line to the output stream, so the binary can be wired into any
//! MCP-compatible client as a subprocess.

use anyhow::Result;
use humansize::{format_size, DECIMAL};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, warn};

use dupescan::core::merkle;
use dupescan::{DedupEngine, DedupResult};

use crate::{discover_files, load_files};

const DEFAULT_THRESHOLD: f64 = 0.8;
const DEFAULT_CHUNK_SIZE: usize = 1024;
const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Deserialize)]
struct McpRequest {
    #[serde(default)]
    #[allow(dead_code)]
    jsonrpc: String,
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i64,
    message: String,
}

/// Serve requests until the input stream closes.
pub fn serve(input: impl BufRead, mut output: impl Write) -> Result<()> {
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request: McpRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "ignoring undecodable request");
                continue;
            }
        };
        debug!(method = %request.method, "request received");

        let response = dispatch(request);
        serde_json::to_writer(&mut output, &response)?;
        writeln!(output)?;
        output.flush()?;
    }
    Ok(())
}

fn dispatch(request: McpRequest) -> McpResponse {
    let outcome = match request.method.as_str() {
        "initialize" => Ok(initialize_result()),
        "tools/list" => Ok(tools_list_result()),
        "tools/call" => handle_tool_call(&request.params).map_err(|err| McpError {
            code: -32603,
            message: err.to_string(),
        }),
        other => Err(McpError {
            code: -32601,
            message: format!("Method not found: {}", other),
        }),
    };

    match outcome {
        Ok(result) => McpResponse {
            jsonrpc: "2.0",
            id: request.id,
            result: Some(result),
            error: None,
        },
        Err(error) => McpResponse {
            jsonrpc: "2.0",
            id: request.id,
            result: None,
            error: Some(error),
        },
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "serverInfo": {
            "name": "dupescan",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": { "tools": {} },
    })
}

fn tools_list_result() -> Value {
    json!({
        "tools": [
            {
                "name": "analyze_duplicates",
                "description": "Analyze a directory for duplicate files using Merkle tree content hashing. Finds exact, partial, and visually similar duplicates.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "directory": { "type": "string", "description": "Path to directory to analyze" },
                        "threshold": { "type": "number", "description": "Similarity threshold (0.0-1.0) for partial matches. Default: 0.8", "default": DEFAULT_THRESHOLD },
                        "chunk_size": { "type": "integer", "description": "Content chunk size in bytes. Default: 1024", "default": DEFAULT_CHUNK_SIZE },
                        "max_depth": { "type": "integer", "description": "Maximum directory depth to scan. Default: 10", "default": DEFAULT_MAX_DEPTH },
                    },
                    "required": ["directory"],
                },
            },
            {
                "name": "get_duplicate_groups",
                "description": "Get duplicate groups showing files that can be safely removed",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "directory": { "type": "string", "description": "Path to directory to analyze" },
                    },
                    "required": ["directory"],
                },
            },
            {
                "name": "check_file_hash",
                "description": "Get content hash, Merkle root, and chunk count for a specific file",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "file_path": { "type": "string", "description": "Path to file to hash" },
                    },
                    "required": ["file_path"],
                },
            },
        ],
    })
}

fn handle_tool_call(params: &Value) -> Result<Value> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("tool name required"))?;
    let args = params.get("arguments").unwrap_or(&Value::Null);

    match name {
        "analyze_duplicates" => analyze_duplicates_tool(args),
        "get_duplicate_groups" => duplicate_groups_tool(args),
        "check_file_hash" => check_file_hash_tool(args),
        other => anyhow::bail!("unknown tool: {}", other),
    }
}

fn run_analysis(args: &Value) -> Result<DedupResult> {
    let directory = args
        .get("directory")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("directory parameter required"))?;
    let threshold = args
        .get("threshold")
        .and_then(Value::as_f64)
        .unwrap_or(DEFAULT_THRESHOLD);
    let chunk_size = args
        .get("chunk_size")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_CHUNK_SIZE as u64) as usize;
    let max_depth = args
        .get("max_depth")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_MAX_DEPTH as u64) as usize;

    let engine = DedupEngine::new(threshold, chunk_size)?;
    let paths = discover_files(Path::new(directory), &[], Some(max_depth))?;
    let files = load_files(&paths);
    Ok(engine.analyze(files, None)?)
}

fn analyze_duplicates_tool(args: &Value) -> Result<Value> {
    let result = run_analysis(args)?;
    let text = format!(
        "Analyzed {} file(s): {} unique, {} exact duplicates, {} partial duplicates, \
         {} visual duplicates. Reclaimable space: {}.",
        result.total_files,
        result.unique_files,
        result.full_dup_count,
        result.partial_dup_count,
        result.visual_dup_count,
        format_size(result.space_saved, DECIMAL),
    );
    Ok(text_content(text))
}

fn duplicate_groups_tool(args: &Value) -> Result<Value> {
    let result = run_analysis(args)?;
    if result.duplicate_groups.is_empty() {
        return Ok(text_content("No duplicate groups found.".to_string()));
    }

    let mut text = format!("{} duplicate group(s):\n", result.duplicate_groups.len());
    for (i, group) in result.duplicate_groups.iter().enumerate() {
        text.push_str(&format!(
            "\nGroup {} [{}] similarity {:.2}, save {}:\n",
            i + 1,
            group.group_type,
            group.similarity,
            format_size(group.savings, DECIMAL),
        ));
        for file in &group.files {
            text.push_str(&format!("  - {}\n", file));
        }
    }
    Ok(text_content(text))
}

fn check_file_hash_tool(args: &Value) -> Result<Value> {
    let file_path = args
        .get("file_path")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("file_path parameter required"))?;

    let data = std::fs::read(file_path)?;
    let hashes = merkle::chunk_hashes(&data, DEFAULT_CHUNK_SIZE);
    let chunk_count = hashes.len();
    let tree = merkle::build_merkle_tree(hashes);

    let text = format!(
        "File: {}\nSize: {} bytes\nChunks: {}\nMerkle root: {}",
        file_path,
        data.len(),
        chunk_count,
        merkle::to_hex(&tree.hash),
    );
    Ok(text_content(text))
}

fn text_content(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn roundtrip(requests: &str) -> Vec<Value> {
        let mut output = Vec::new();
        serve(requests.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_initialize_and_tools_list() {
        let responses = roundtrip(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n\
             {\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}\n",
        );

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "dupescan");
        let tools = responses[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[0]["name"], "analyze_duplicates");
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let responses =
            roundtrip("{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"resources/list\"}\n");
        assert_eq!(responses[0]["error"]["code"], -32601);
    }

    #[test]
    fn test_undecodable_line_is_skipped() {
        let responses = roundtrip(
            "this is not json\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"initialize\"}\n",
        );
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 1);
    }

    #[test]
    fn test_check_file_hash_tool() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("x.bin");
        fs::write(&file, vec![1u8; 2500]).unwrap();

        let request = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": {
                "name": "check_file_hash",
                "arguments": { "file_path": file.to_string_lossy() },
            },
        });
        let responses = roundtrip(&format!("{}\n", request));

        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Size: 2500 bytes"));
        assert!(text.contains("Chunks: 3"));
        assert!(text.contains("Merkle root: "));
    }

    #[test]
    fn test_analyze_duplicates_tool_end_to_end() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.bin"), vec![9u8; 4096]).unwrap();
        fs::write(dir.path().join("b.bin"), vec![9u8; 4096]).unwrap();

        let request = json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {
                "name": "analyze_duplicates",
                "arguments": { "directory": dir.path().to_string_lossy() },
            },
        });
        let responses = roundtrip(&format!("{}\n", request));

        let text = responses[0]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Analyzed 2 file(s)"));
        assert!(text.contains("2 exact duplicates"));
    }

    #[test]
    fn test_missing_directory_argument_errors() {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": { "name": "analyze_duplicates", "arguments": {} },
        });
        let responses = roundtrip(&format!("{}\n", request));
        assert_eq!(responses[0]["error"]["code"], -32603);
        assert!(responses[0]["error"]["message"]
            .as_str()
            .unwrap()
            .contains("directory"));
    }
}
