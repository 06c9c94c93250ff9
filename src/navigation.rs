//! Static navigation tree.
//!
//! The sidebar is a hand-curated, two-level hierarchy: top-level entries are
//! either single pages or sections whose children are the pages inside that
//! section. The tree is built once per run, validated, and then shared
//! read-only across every page render. [`NavigationTree::resolve`] produces
//! the per-page view with hrefs relative to the page being rendered.

use crate::error::{Error, Result};
use crate::paths::{href_for, DocumentPath};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One node of the navigation specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    /// Display title
    pub title: String,
    /// Document this entry links to
    pub path: DocumentPath,
    /// Pages of a section, in display order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    pub fn page(title: impl Into<String>, path: DocumentPath) -> Self {
        Self {
            title: title.into(),
            path,
            children: Vec::new(),
        }
    }

    pub fn section(title: impl Into<String>, path: DocumentPath, children: Vec<NavEntry>) -> Self {
        Self {
            title: title.into(),
            path,
            children,
        }
    }

    pub fn is_section(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Validated, immutable navigation tree
#[derive(Debug, Clone)]
pub struct NavigationTree {
    entries: Vec<NavEntry>,
}

impl NavigationTree {
    /// Build a tree from top-level entries.
    ///
    /// Fails if a path appears twice, if a page of a section is not nested
    /// directly below the section's own path, or if the tree is deeper than
    /// two levels.
    pub fn from_entries(entries: Vec<NavEntry>) -> Result<Self> {
        validate(&entries)?;
        Ok(Self { entries })
    }

    /// The default glossary navigation
    pub fn builtin() -> Result<Self> {
        let mut entries = Vec::with_capacity(BUILTIN_SECTIONS.len());

        for (title, path, pages) in BUILTIN_SECTIONS {
            let children = pages
                .iter()
                .map(|(title, path)| -> Result<NavEntry> {
                    Ok(NavEntry::page(*title, DocumentPath::parse(path)?))
                })
                .collect::<Result<Vec<_>>>()?;
            entries.push(NavEntry::section(*title, DocumentPath::parse(path)?, children));
        }

        Self::from_entries(entries)
    }

    /// Top-level entries in declared order
    pub fn entries(&self) -> &[NavEntry] {
        &self.entries
    }

    /// All entries, depth-first in declared order
    pub fn iter(&self) -> impl Iterator<Item = &NavEntry> {
        self.entries
            .iter()
            .flat_map(|entry| std::iter::once(entry).chain(entry.children.iter()))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, path: &DocumentPath) -> Option<&NavEntry> {
        self.iter().find(|entry| &entry.path == path)
    }

    /// Navigation paths with no matching document in `documents`
    pub fn missing_from<'a>(&'a self, documents: &[DocumentPath]) -> Vec<&'a DocumentPath> {
        let available: HashSet<&DocumentPath> = documents.iter().collect();
        self.iter()
            .map(|entry| &entry.path)
            .filter(|path| !available.contains(path))
            .collect()
    }

    /// Resolve the tree for the page generated from `current`.
    ///
    /// Every href is relative to `current`'s output location. A `current`
    /// path that is not in the tree just leaves every item unmarked.
    pub fn resolve(&self, current: &DocumentPath, page_extension: &str) -> RenderedNav {
        let depth = current.depth();
        let items = self
            .entries
            .iter()
            .map(|entry| resolve_entry(entry, current, depth, page_extension))
            .collect();

        RenderedNav { items }
    }
}

fn validate(entries: &[NavEntry]) -> Result<()> {
    let mut seen = HashSet::new();

    for entry in entries {
        if !seen.insert(entry.path.as_str()) {
            return Err(Error::DuplicateNavPath(entry.path.to_string()));
        }

        for child in &entry.children {
            if child.is_section() {
                return Err(Error::config_validation(format!(
                    "navigation entry '{}' is nested too deep: sections may only contain pages",
                    child.path
                )));
            }
            if child.path.parent() != Some(entry.path.as_str()) {
                return Err(Error::malformed_path(
                    child.path.as_str(),
                    format!("expected a page directly below section '{}'", entry.path),
                ));
            }
            if !seen.insert(child.path.as_str()) {
                return Err(Error::DuplicateNavPath(child.path.to_string()));
            }
        }
    }

    Ok(())
}

fn resolve_entry(
    entry: &NavEntry,
    current: &DocumentPath,
    depth: usize,
    page_extension: &str,
) -> RenderedNavItem {
    RenderedNavItem {
        title: entry.title.clone(),
        path: entry.path.to_string(),
        href: href_for(&entry.path, depth, page_extension),
        is_current: &entry.path == current,
        children: entry
            .children
            .iter()
            .map(|child| resolve_entry(child, current, depth, page_extension))
            .collect(),
    }
}

/// Navigation as seen from one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNav {
    pub items: Vec<RenderedNavItem>,
}

/// A navigation link with its page-relative href
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedNavItem {
    pub title: String,
    pub path: String,
    pub href: String,
    pub is_current: bool,
    pub children: Vec<RenderedNavItem>,
}

impl RenderedNav {
    /// All items, depth-first
    pub fn iter(&self) -> impl Iterator<Item = &RenderedNavItem> {
        self.items
            .iter()
            .flat_map(|item| std::iter::once(item).chain(item.children.iter()))
    }

    /// The item marked as the current page, if any
    pub fn current(&self) -> Option<&RenderedNavItem> {
        self.iter().find(|item| item.is_current)
    }
}

type BuiltinSection = (&'static str, &'static str, &'static [(&'static str, &'static str)]);

const BUILTIN_SECTIONS: &[BuiltinSection] = &[
    ("Home", "readme", &[]),
    (
        "Device Hardware",
        "device-hardware",
        &[
            ("CUDA (Device Architecture)", "device-hardware/cuda-device-architecture"),
            ("Streaming Multiprocessor", "device-hardware/streaming-multiprocessor"),
            ("Core", "device-hardware/core"),
            ("Special Function Unit", "device-hardware/special-function-unit"),
            ("Load/Store Unit", "device-hardware/load-store-unit"),
            ("Warp Scheduler", "device-hardware/warp-scheduler"),
            ("CUDA Core", "device-hardware/cuda-core"),
            ("Tensor Core", "device-hardware/tensor-core"),
            ("Tensor Memory Accelerator", "device-hardware/tensor-memory-accelerator"),
            (
                "Streaming Multiprocessor Architecture",
                "device-hardware/streaming-multiprocessor-architecture",
            ),
            ("Texture Processing Cluster", "device-hardware/texture-processing-cluster"),
            ("Graphics/GPU Processing Cluster", "device-hardware/graphics-processing-cluster"),
            ("Register File", "device-hardware/register-file"),
            ("L1 Data Cache", "device-hardware/l1-data-cache"),
            ("Tensor Memory", "device-hardware/tensor-memory"),
            ("GPU RAM", "device-hardware/gpu-ram"),
        ],
    ),
    (
        "Device Software",
        "device-software",
        &[
            ("CUDA (Programming Model)", "device-software/cuda-programming-model"),
            ("Streaming Assembler", "device-software/streaming-assembler"),
            ("Parallel Thread Execution", "device-software/parallel-thread-execution"),
            ("Compute Capability", "device-software/compute-capability"),
            ("Thread", "device-software/thread"),
            ("Warp", "device-software/warp"),
            ("Cooperative Thread Array", "device-software/cooperative-thread-array"),
            ("Kernel", "device-software/kernel"),
            ("Thread Block", "device-software/thread-block"),
            ("Thread Block Grid", "device-software/thread-block-grid"),
            ("Thread Hierarchy", "device-software/thread-hierarchy"),
            ("Memory Hierarchy", "device-software/memory-hierarchy"),
            ("Registers", "device-software/registers"),
            ("Shared Memory", "device-software/shared-memory"),
            ("Global Memory", "device-software/global-memory"),
        ],
    ),
    (
        "Host Software",
        "host-software",
        &[
            ("CUDA (Software Platform)", "host-software/cuda-software-platform"),
            ("CUDA C++", "host-software/cuda-c"),
            ("NVIDIA GPU Drivers", "host-software/nvidia-gpu-drivers"),
            ("nvidia.ko", "host-software/nvidia-ko"),
            ("CUDA Driver API", "host-software/cuda-driver-api"),
            ("libcuda.so", "host-software/libcuda"),
            ("NVIDIA Management Library", "host-software/nvml"),
            ("libnvml.so", "host-software/libnvml"),
            ("nvidia-smi", "host-software/nvidia-smi"),
            ("CUDA Runtime API", "host-software/cuda-runtime-api"),
            ("libcudart.so", "host-software/libcudart"),
            ("NVIDIA CUDA Compiler Driver", "host-software/nvcc"),
            ("NVIDIA Runtime Compiler", "host-software/nvrtc"),
            ("CUDA Profiling Tools Interface", "host-software/cupti"),
            ("NVIDIA Nsight Systems", "host-software/nsight-systems"),
            ("CUDA Binary Utilities", "host-software/cuda-binary-utilities"),
            ("cuBLAS", "host-software/cublas"),
            ("cuDNN", "host-software/cudnn"),
        ],
    ),
    (
        "Performance",
        "perf",
        &[
            ("Performance Bottleneck", "perf/performance-bottleneck"),
            ("Roofline Model", "perf/roofline-model"),
            ("Compute-bound", "perf/compute-bound"),
            ("Memory-bound", "perf/memory-bound"),
            ("Arithmetic Intensity", "perf/arithmetic-intensity"),
            ("Overhead", "perf/overhead"),
            ("Little's Law", "perf/littles-law"),
            ("Memory Bandwidth", "perf/memory-bandwidth"),
            ("Arithmetic Bandwidth", "perf/arithmetic-bandwidth"),
            ("Latency Hiding", "perf/latency-hiding"),
            ("Warp Execution State", "perf/warp-execution-state"),
            ("Active Cycle", "perf/active-cycle"),
            ("Occupancy", "perf/occupancy"),
            ("Pipe Utilization", "perf/pipe-utilization"),
            ("Peak Rate", "perf/peak-rate"),
            ("Issue Efficiency", "perf/issue-efficiency"),
            (
                "Streaming Multiprocessor Utilization",
                "perf/streaming-multiprocessor-utilization",
            ),
            ("Warp Divergence", "perf/warp-divergence"),
            ("Branch Efficiency", "perf/branch-efficiency"),
            ("Memory Coalescing", "perf/memory-coalescing"),
            ("Bank Conflict", "perf/bank-conflict"),
            ("Register Pressure", "perf/register-pressure"),
        ],
    ),
];
