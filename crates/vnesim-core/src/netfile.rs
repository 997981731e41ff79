//! Network file ingestion for vnesim.
//!
//! Line-oriented text format shared by substrate and request files:
//!
//! - substrate: first line `node_count link_count`, then `node_count` lines
//!   of `x y cpu`, then `link_count` lines of `src dst bw distance`.
//! - request: first line `node_count link_count arrival duration
//!   max_distance`, then the same node and link line shapes (demands
//!   instead of capacities).
//!
//! Request files are named `req<k>.txt` under a directory; the loader reads
//! a configured count of them and assigns request ids by index. Node
//! coordinates and the request distance bound are parsed but not used by
//! the admission core.

use crate::request::{VirtualLink, VirtualNode, VirtualRequest};
use crate::substrate::SubstrateGraph;
use std::path::Path;
use thiserror::Error;
use vnesim_strategies::link_key;

#[derive(Error, Debug)]
pub enum NetFileError {
    #[error("Failed to read network file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed line {line}: {detail}")]
    Malformed { line: usize, detail: String },
    #[error("Expected {expected} more lines, file ended at line {line}")]
    Truncated { expected: usize, line: usize },
}

fn malformed(line: usize, detail: impl Into<String>) -> NetFileError {
    NetFileError::Malformed {
        line,
        detail: detail.into(),
    }
}

/// Non-empty lines with their 1-based line numbers.
fn content_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
        .collect()
}

fn parse_u64(field: &str, line: usize) -> Result<u64, NetFileError> {
    field
        .parse::<u64>()
        .map_err(|_| malformed(line, format!("expected integer, got '{}'", field)))
}

fn parse_f64(field: &str, line: usize) -> Result<f64, NetFileError> {
    field
        .parse::<f64>()
        .map_err(|_| malformed(line, format!("expected number, got '{}'", field)))
}

/// Parse a substrate network from file content.
pub fn parse_substrate(content: &str) -> Result<SubstrateGraph, NetFileError> {
    let lines = content_lines(content);
    let (header_line, header) = lines
        .first()
        .ok_or_else(|| malformed(1, "empty file"))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 2 {
        return Err(malformed(
            *header_line,
            format!("substrate header needs 2 fields, got {}", fields.len()),
        ));
    }
    let node_count = parse_u64(fields[0], *header_line)? as usize;
    let link_count = parse_u64(fields[1], *header_line)? as usize;

    let body = &lines[1..];
    if body.len() < node_count + link_count {
        return Err(NetFileError::Truncated {
            expected: node_count + link_count - body.len(),
            line: lines.last().map(|(n, _)| *n).unwrap_or(1),
        });
    }

    let mut graph = SubstrateGraph::new();
    for (id, (line_no, line)) in body[..node_count].iter().enumerate() {
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() != 3 {
            return Err(malformed(*line_no, "node line needs 'x y cpu'"));
        }
        graph.add_node(
            id as u32,
            parse_f64(f[0], *line_no)?,
            parse_f64(f[1], *line_no)?,
            parse_f64(f[2], *line_no)?,
        );
    }
    for (line_no, line) in &body[node_count..node_count + link_count] {
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() != 4 {
            return Err(malformed(*line_no, "link line needs 'src dst bw distance'"));
        }
        graph.add_link(
            parse_u64(f[0], *line_no)? as u32,
            parse_u64(f[1], *line_no)? as u32,
            parse_f64(f[2], *line_no)?,
            parse_f64(f[3], *line_no)?,
        );
    }
    Ok(graph)
}

/// Load a substrate network from a file.
pub fn load_substrate(path: &Path) -> Result<SubstrateGraph, NetFileError> {
    let content = std::fs::read_to_string(path)?;
    parse_substrate(&content)
}

/// Parse a virtual network request from file content, assigning it `id`.
pub fn parse_request(content: &str, id: u64) -> Result<VirtualRequest, NetFileError> {
    let lines = content_lines(content);
    let (header_line, header) = lines
        .first()
        .ok_or_else(|| malformed(1, "empty file"))?;
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(malformed(
            *header_line,
            format!("request header needs 5 fields, got {}", fields.len()),
        ));
    }
    let node_count = parse_u64(fields[0], *header_line)? as usize;
    let link_count = parse_u64(fields[1], *header_line)? as usize;
    let arrival = parse_u64(fields[2], *header_line)?;
    let duration = parse_u64(fields[3], *header_line)?;
    // fields[4] is the distance bound; not used by the admission core.

    let body = &lines[1..];
    if body.len() < node_count + link_count {
        return Err(NetFileError::Truncated {
            expected: node_count + link_count - body.len(),
            line: lines.last().map(|(n, _)| *n).unwrap_or(1),
        });
    }

    let mut nodes = Vec::with_capacity(node_count);
    for (vid, (line_no, line)) in body[..node_count].iter().enumerate() {
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() != 3 {
            return Err(malformed(*line_no, "node line needs 'x y cpu'"));
        }
        nodes.push(VirtualNode {
            id: vid as u32,
            cpu: parse_f64(f[2], *line_no)?,
        });
    }
    let mut links = Vec::with_capacity(link_count);
    for (line_no, line) in &body[node_count..node_count + link_count] {
        let f: Vec<&str> = line.split_whitespace().collect();
        if f.len() != 4 {
            return Err(malformed(*line_no, "link line needs 'src dst bw distance'"));
        }
        links.push(VirtualLink {
            endpoints: link_key(
                parse_u64(f[0], *line_no)? as u32,
                parse_u64(f[1], *line_no)? as u32,
            ),
            bw: parse_f64(f[2], *line_no)?,
        });
    }

    Ok(VirtualRequest {
        id,
        arrival,
        duration,
        nodes,
        links,
    })
}

/// Load one request file, assigning it `id`.
pub fn load_request(path: &Path, id: u64) -> Result<VirtualRequest, NetFileError> {
    let content = std::fs::read_to_string(path)?;
    parse_request(&content, id)
}

/// Load `count` request files `req0.txt .. req<count-1>.txt` from a
/// directory. Ids are assigned by file index.
pub fn load_requests(dir: &Path, count: u64) -> Result<Vec<VirtualRequest>, NetFileError> {
    let mut requests = Vec::with_capacity(count as usize);
    for i in 0..count {
        let path = dir.join(format!("req{}.txt", i));
        requests.push(load_request(&path, i)?);
    }
    Ok(requests)
}

/// Write a request in the line-oriented format the loader reads.
/// Coordinates are not modeled on virtual nodes and are written as zeros.
pub fn write_request(request: &VirtualRequest, path: &Path) -> Result<(), NetFileError> {
    use std::io::Write;
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);

    writeln!(
        writer,
        "{} {} {} {} 0",
        request.nodes.len(),
        request.links.len(),
        request.arrival,
        request.duration,
    )?;
    for node in &request.nodes {
        writeln!(writer, "0 0 {}", node.cpu)?;
    }
    for link in &request.links {
        writeln!(
            writer,
            "{} {} {} 1",
            link.endpoints.0, link.endpoints.1, link.bw,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBSTRATE: &str = "\
3 2
0.1 0.2 50
0.3 0.4 60
0.5 0.6 70
0 1 100 1.5
1 2 120 2.5
";

    const REQUEST: &str = "\
2 1 1000 500 20
0.1 0.2 6
0.3 0.4 8
0 1 4 1
";

    #[test]
    fn test_parse_substrate() {
        let graph = parse_substrate(SUBSTRATE).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 2);
        assert_eq!(graph.nodes[&1].cpu_total, 60.0);
        assert_eq!(graph.nodes[&1].cpu_remain, 60.0);
        assert_eq!(graph.links[&(0, 1)].bw_total, 100.0);
        assert_eq!(graph.links[&(1, 2)].distance, 2.5);
    }

    #[test]
    fn test_parse_request() {
        let request = parse_request(REQUEST, 7).unwrap();
        assert_eq!(request.id, 7);
        assert_eq!(request.arrival, 1000);
        assert_eq!(request.duration, 500);
        assert_eq!(request.departure(), 1500);
        assert_eq!(request.nodes.len(), 2);
        assert_eq!(request.nodes[1].cpu, 8.0);
        assert_eq!(request.links[0].endpoints, (0, 1));
        assert_eq!(request.links[0].bw, 4.0);
    }

    #[test]
    fn test_parse_skips_blank_lines() {
        let padded = format!("\n{}\n\n", SUBSTRATE);
        let graph = parse_substrate(&padded).unwrap();
        assert_eq!(graph.nodes.len(), 3);
    }

    #[test]
    fn test_malformed_header() {
        let err = parse_substrate("3\n").unwrap_err();
        assert!(matches!(err, NetFileError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_malformed_node_line() {
        let err = parse_substrate("1 0\n0.1 notanumber 50\n").unwrap_err();
        assert!(matches!(err, NetFileError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_truncated_file() {
        let err = parse_substrate("3 2\n0 0 50\n").unwrap_err();
        assert!(matches!(err, NetFileError::Truncated { .. }));
    }

    #[test]
    fn test_write_then_parse_round_trip() {
        let request = parse_request(REQUEST, 3).unwrap();
        let dir = std::env::temp_dir().join("vnesim-netfile-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("req3.txt");
        write_request(&request, &path).unwrap();

        let reread = load_request(&path, 3).unwrap();
        assert_eq!(reread.arrival, request.arrival);
        assert_eq!(reread.duration, request.duration);
        assert_eq!(reread.nodes.len(), request.nodes.len());
        assert_eq!(reread.links.len(), request.links.len());
        assert_eq!(reread.links[0].bw, request.links[0].bw);
    }
}
