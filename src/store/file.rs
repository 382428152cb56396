//! Directory-backed persistent store.
//!
//! Three flat files — `nodes.melvin`, `edges.melvin`, `paths.melvin` — each
//! carrying a `FileHeader` followed by packed, big-endian records
//! (`NodeRecHeader`/`EdgeRec`-style layout), extended with a handful of
//! fields (`id`, `confirm_count`, `pin_expiry`) that a pure in-memory index
//! could leave implicit but an on-disk record cannot.
//!
//! `FileStore` keeps the full graph mirrored in memory (via `MemoryStore`)
//! and treats the on-disk files as a write-behind snapshot: `open` loads
//! them once, `flush` rewrites them in full. Random mid-file rewrites are
//! not attempted — graphs this engine targets fit comfortably in memory,
//! and a full rewrite keeps the encode/decode logic the single source of
//! truth for the format.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path as FsPath, PathBuf};

use crate::error::{StorageError, StorageResult};
use crate::graph::{Edge, EdgeFlags, Node, NodeFlags, NodeType, Path, Relation, RelMask};
use crate::ids::{EdgeId, NodeId, PathId};
use crate::store::{GraphStore, MemoryStore, NodeFilter};

const MAGIC: u32 = 0x4D45_4C56; // "MELV"
const VERSION: u32 = 1;
const ENDIAN_BE: u8 = 0;
const ALIGNMENT: u8 = 1;

pub struct FileStore {
    dir: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open (or create) a directory-backed store, loading any existing
    /// `.melvin` files found there.
    pub fn open(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let inner = MemoryStore::new();
        let store = Self { dir, inner };
        store.load()?;
        Ok(store)
    }

    fn nodes_path(&self) -> PathBuf {
        self.dir.join("nodes.melvin")
    }
    fn edges_path(&self) -> PathBuf {
        self.dir.join("edges.melvin")
    }
    fn paths_path(&self) -> PathBuf {
        self.dir.join("paths.melvin")
    }

    fn load(&self) -> StorageResult<()> {
        if self.nodes_path().exists() {
            for node in read_nodes(&self.nodes_path())? {
                self.inner.put_node(node)?;
            }
        }
        if self.edges_path().exists() {
            for edge in read_edges(&self.edges_path())? {
                self.inner.put_edge(edge)?;
            }
        }
        if self.paths_path().exists() {
            for path in read_paths(&self.paths_path())? {
                self.inner.put_path(path)?;
            }
        }
        Ok(())
    }
}

fn write_header(w: &mut impl Write, num_nodes: u32, num_edges: u32, num_paths: u32) -> StorageResult<()> {
    let now = crate::graph::now_ns();
    w.write_all(&MAGIC.to_be_bytes())?;
    w.write_all(&VERSION.to_be_bytes())?;
    w.write_all(&[ENDIAN_BE, ALIGNMENT, 0, 0])?;
    w.write_all(&0u64.to_be_bytes())?; // merkle_root: reserved for future integrity checks
    w.write_all(&now.to_be_bytes())?;
    w.write_all(&now.to_be_bytes())?;
    w.write_all(&num_nodes.to_be_bytes())?;
    w.write_all(&num_edges.to_be_bytes())?;
    w.write_all(&num_paths.to_be_bytes())?;
    w.write_all(&0u32.to_be_bytes())?;
    Ok(())
}

struct FileHeader {
    num_nodes: u32,
    num_edges: u32,
    num_paths: u32,
}

fn read_header(r: &mut impl Read) -> StorageResult<FileHeader> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    let magic = u32::from_be_bytes(buf);
    if magic != MAGIC {
        return Err(StorageError::Corrupt("bad magic".into()));
    }
    r.read_exact(&mut buf)?;
    let version = u32::from_be_bytes(buf);
    if version != VERSION {
        return Err(StorageError::Corrupt(format!("unsupported file version {version}")));
    }
    let mut b1 = [0u8; 4];
    r.read_exact(&mut b1)?; // endianness/alignment/reserved
    let mut b8 = [0u8; 8];
    r.read_exact(&mut b8)?; // merkle_root
    r.read_exact(&mut b8)?; // ts_created
    r.read_exact(&mut b8)?; // ts_updated
    let mut n = [0u8; 4];
    r.read_exact(&mut n)?;
    let num_nodes = u32::from_be_bytes(n);
    r.read_exact(&mut n)?;
    let num_edges = u32::from_be_bytes(n);
    r.read_exact(&mut n)?;
    let num_paths = u32::from_be_bytes(n);
    r.read_exact(&mut n)?; // reserved2
    Ok(FileHeader { num_nodes, num_edges, num_paths })
}

fn write_nodes(path: &FsPath, nodes: &[Node]) -> StorageResult<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_header(&mut w, nodes.len() as u32, 0, 0)?;
    for n in nodes {
        w.write_all(n.id.as_bytes())?;
        w.write_all(&(n.node_type as u32).to_be_bytes())?;
        w.write_all(&n.flags.bits().to_be_bytes())?;
        w.write_all(&n.ts_created.to_be_bytes())?;
        w.write_all(&n.ts_updated.to_be_bytes())?;
        w.write_all(&(n.payload.len() as u32).to_be_bytes())?;
        w.write_all(&n.degree_hint.to_be_bytes())?;
        w.write_all(&n.payload)?;
        w.write_all(&n.confirm_count.to_be_bytes())?;
        w.write_all(&n.pin_expiry.to_be_bytes())?;
        let checksum: [u8; 4] = blake3::hash(&n.payload).as_bytes()[0..4].try_into().unwrap();
        w.write_all(&checksum)?;
    }
    w.flush()?;
    Ok(())
}

fn read_nodes(path: &FsPath) -> StorageResult<Vec<Node>> {
    let mut r = BufReader::new(File::open(path)?);
    let header = read_header(&mut r)?;
    let mut out = Vec::with_capacity(header.num_nodes as usize);
    for _ in 0..header.num_nodes {
        let mut id_bytes = [0u8; 32];
        r.read_exact(&mut id_bytes)?;
        let mut u4 = [0u8; 4];
        r.read_exact(&mut u4)?;
        let node_type = node_type_from_u32(u32::from_be_bytes(u4))?;
        r.read_exact(&mut u4)?;
        let flags = NodeFlags::from_bits_truncate(u32::from_be_bytes(u4));
        let mut u8b = [0u8; 8];
        r.read_exact(&mut u8b)?;
        let ts_created = u64::from_be_bytes(u8b);
        r.read_exact(&mut u8b)?;
        let ts_updated = u64::from_be_bytes(u8b);
        r.read_exact(&mut u4)?;
        let payload_len = u32::from_be_bytes(u4) as usize;
        r.read_exact(&mut u4)?;
        let degree_hint = u32::from_be_bytes(u4);
        let mut payload = vec![0u8; payload_len];
        r.read_exact(&mut payload)?;
        r.read_exact(&mut u4)?;
        let confirm_count = u32::from_be_bytes(u4);
        r.read_exact(&mut u8b)?;
        let pin_expiry = u64::from_be_bytes(u8b);
        let mut checksum = [0u8; 4];
        r.read_exact(&mut checksum)?;
        out.push(Node {
            id: NodeId::from_bytes(id_bytes),
            node_type,
            flags,
            ts_created,
            ts_updated,
            payload,
            degree_hint,
            confirm_count,
            pin_expiry,
        });
    }
    Ok(out)
}

fn node_type_from_u32(v: u32) -> StorageResult<NodeType> {
    Ok(match v {
        0 => NodeType::Symbol,
        1 => NodeType::Phrase,
        2 => NodeType::Concept,
        3 => NodeType::Abstraction,
        4 => NodeType::MetaCogStep,
        255 => NodeType::Other,
        other => return Err(StorageError::Corrupt(format!("unknown node type {other}"))),
    })
}

fn relation_from_u32(v: u32) -> StorageResult<Relation> {
    Ok(match v {
        0 => Relation::Exact,
        1 => Relation::Temporal,
        2 => Relation::Leap,
        3 => Relation::Generalization,
        4 => Relation::Isa,
        5 => Relation::HasProperty,
        6 => Relation::PartOf,
        7 => Relation::Causes,
        other => return Err(StorageError::Corrupt(format!("unknown relation {other}"))),
    })
}

fn write_edges(path: &FsPath, edges: &[Edge]) -> StorageResult<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_header(&mut w, 0, edges.len() as u32, 0)?;
    for e in edges {
        w.write_all(e.src.as_bytes())?;
        w.write_all(&(e.rel as u32).to_be_bytes())?;
        w.write_all(e.dst.as_bytes())?;
        w.write_all(&e.layer.to_be_bytes())?;
        w.write_all(&e.w.to_be_bytes())?;
        w.write_all(&e.w_core.to_be_bytes())?;
        w.write_all(&e.w_ctx.to_be_bytes())?;
        w.write_all(&e.ts_last.to_be_bytes())?;
        w.write_all(&e.count.to_be_bytes())?;
        w.write_all(&e.flags.bits().to_be_bytes())?;
        let causal = e.causal_strength.unwrap_or(-1.0);
        w.write_all(&causal.to_be_bytes())?;
    }
    w.flush()?;
    Ok(())
}

fn read_edges(path: &FsPath) -> StorageResult<Vec<Edge>> {
    let mut r = BufReader::new(File::open(path)?);
    let header = read_header(&mut r)?;
    let mut out = Vec::with_capacity(header.num_edges as usize);
    for _ in 0..header.num_edges {
        let mut id32 = [0u8; 32];
        r.read_exact(&mut id32)?;
        let src = NodeId::from_bytes(id32);
        let mut u4 = [0u8; 4];
        r.read_exact(&mut u4)?;
        let rel = relation_from_u32(u32::from_be_bytes(u4))?;
        r.read_exact(&mut id32)?;
        let dst = NodeId::from_bytes(id32);
        let mut u2 = [0u8; 2];
        r.read_exact(&mut u2)?;
        let layer = u16::from_be_bytes(u2);
        r.read_exact(&mut u4)?;
        let w = f32::from_be_bytes(u4);
        r.read_exact(&mut u4)?;
        let w_core = f32::from_be_bytes(u4);
        r.read_exact(&mut u4)?;
        let w_ctx = f32::from_be_bytes(u4);
        let mut u8b = [0u8; 8];
        r.read_exact(&mut u8b)?;
        let ts_last = u64::from_be_bytes(u8b);
        r.read_exact(&mut u4)?;
        let count = u32::from_be_bytes(u4);
        r.read_exact(&mut u4)?;
        let flags = EdgeFlags::from_bits_truncate(u32::from_be_bytes(u4));
        r.read_exact(&mut u4)?;
        let causal = f32::from_be_bytes(u4);
        let causal_strength = if causal < 0.0 { None } else { Some(causal) };
        let id = crate::ids::edge_id(src, rel, dst, layer);
        out.push(Edge {
            id,
            src,
            dst,
            rel,
            layer,
            w_core,
            w_ctx,
            w,
            ts_last,
            count,
            flags,
            causal_strength,
        });
    }
    Ok(out)
}

fn write_paths(path: &FsPath, paths: &[Path]) -> StorageResult<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_header(&mut w, 0, 0, paths.len() as u32)?;
    for p in paths {
        w.write_all(&(p.edges.len() as u32).to_be_bytes())?;
        for e in &p.edges {
            w.write_all(e.as_bytes())?;
        }
        w.write_all(&p.score.to_be_bytes())?;
    }
    w.flush()?;
    Ok(())
}

fn read_paths(path: &FsPath) -> StorageResult<Vec<Path>> {
    let mut r = BufReader::new(File::open(path)?);
    let header = read_header(&mut r)?;
    let mut out = Vec::with_capacity(header.num_paths as usize);
    for _ in 0..header.num_paths {
        let mut u4 = [0u8; 4];
        r.read_exact(&mut u4)?;
        let edge_count = u32::from_be_bytes(u4) as usize;
        let mut edges = Vec::with_capacity(edge_count);
        for _ in 0..edge_count {
            let mut id32 = [0u8; 32];
            r.read_exact(&mut id32)?;
            edges.push(EdgeId::from_bytes(id32));
        }
        let mut u8b = [0u8; 8];
        r.read_exact(&mut u8b)?;
        let score = f64::from_be_bytes(u8b);
        out.push(Path::new(edges, score));
    }
    Ok(out)
}

impl GraphStore for FileStore {
    fn put_node(&self, node: Node) -> StorageResult<NodeId> {
        self.inner.put_node(node)
    }
    fn get_node(&self, id: NodeId) -> StorageResult<Option<Node>> {
        self.inner.get_node(id)
    }
    fn remove_node(&self, id: NodeId) -> StorageResult<()> {
        self.inner.remove_node(id)
    }
    fn list_nodes(&self, filter: &NodeFilter) -> StorageResult<Vec<Node>> {
        self.inner.list_nodes(filter)
    }
    fn put_edge(&self, edge: Edge) -> StorageResult<EdgeId> {
        self.inner.put_edge(edge)
    }
    fn get_edge(&self, id: EdgeId) -> StorageResult<Option<Edge>> {
        self.inner.get_edge(id)
    }
    fn replace_edge(&self, edge: Edge) -> StorageResult<()> {
        self.inner.replace_edge(edge)
    }
    fn remove_edge(&self, id: EdgeId) -> StorageResult<()> {
        self.inner.remove_edge(id)
    }
    fn edges_from(&self, node: NodeId, mask: RelMask) -> StorageResult<Vec<Edge>> {
        self.inner.edges_from(node, mask)
    }
    fn edges_into(&self, node: NodeId, mask: RelMask) -> StorageResult<Vec<Edge>> {
        self.inner.edges_into(node, mask)
    }
    fn put_path(&self, path: Path) -> StorageResult<PathId> {
        self.inner.put_path(path)
    }
    fn get_path(&self, id: PathId) -> StorageResult<Option<Path>> {
        self.inner.get_path(id)
    }
    fn node_count(&self) -> StorageResult<usize> {
        self.inner.node_count()
    }
    fn edge_count(&self) -> StorageResult<usize> {
        self.inner.edge_count()
    }
    fn path_count(&self) -> StorageResult<usize> {
        self.inner.path_count()
    }

    fn flush(&self) -> StorageResult<()> {
        let nodes = self.inner.list_nodes(&NodeFilter::default())?;
        write_nodes(&self.nodes_path(), &nodes)?;
        let mut edges = Vec::new();
        for n in &nodes {
            edges.extend(self.inner.edges_from(n.id, RelMask::none())?);
        }
        write_edges(&self.edges_path(), &edges)?;
        write_paths(&self.paths_path(), &self.inner.all_paths())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeType;

    #[test]
    fn roundtrips_nodes_and_edges_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            let a = Node::text(NodeType::Symbol, "cats");
            let b = Node::text(NodeType::Concept, "mammals");
            store.put_node(a.clone()).unwrap();
            store.put_node(b.clone()).unwrap();
            store
                .put_edge(Edge::new(a.id, Relation::Isa, b.id, 0, 0.6, 0.2))
                .unwrap();
            store.flush().unwrap();
        }
        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.node_count().unwrap(), 2);
        assert_eq!(reopened.edge_count().unwrap(), 1);
    }

    #[test]
    fn rejects_a_file_with_mismatched_version() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).unwrap();
            let a = Node::text(NodeType::Symbol, "cats");
            store.put_node(a).unwrap();
            store.flush().unwrap();
        }
        let nodes_path = dir.path().join("nodes.melvin");
        let mut bytes = fs::read(&nodes_path).unwrap();
        bytes[4..8].copy_from_slice(&(VERSION + 1).to_be_bytes());
        fs::write(&nodes_path, bytes).unwrap();
        let err = read_nodes(&nodes_path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
