//! In-process stand-in for a compiled tokenizer module.
//!
//! Speaks the real MessagePack protocol. Vocabulary: one special token
//! `<|bos|>` (id 1) and one token per byte (id 256 + byte).

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokhost_core::abi::{
    ChatTemplateRequest, DetokenizeRequest, EntryPoint, Prefill, TokenizeRequest,
};
use tokhost_core::{CompiledModule, ModuleInstance, SandboxError};

pub const BOS: u32 = 1;
pub const BOS_TEXT: &str = "<|bos|>";
pub const BYTE_BASE: u32 = 256;

/// Text that makes the fake `tokenize` entry point fail.
pub const POISON: &str = "<|fail|>";

#[derive(Default)]
pub struct Probe {
    pub instantiated: AtomicUsize,
    pub dropped: AtomicUsize,
    pub closes: AtomicUsize,
    pub calls: AtomicUsize,
    pub closed: AtomicBool,
    pub fail_instantiate: AtomicBool,
    /// Per-call delay in microseconds, to force overlap between callers.
    pub delay_us: AtomicUsize,
}

impl Probe {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct FakeModule {
    pub probe: Arc<Probe>,
}

impl FakeModule {
    pub fn new() -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

pub struct FakeInstance {
    probe: Arc<Probe>,
}

impl CompiledModule for FakeModule {
    type Instance = FakeInstance;

    fn instantiate(&self) -> Result<FakeInstance, SandboxError> {
        if self.probe.closed.load(Ordering::SeqCst) {
            return Err(SandboxError::new("module closed"));
        }
        if self.probe.fail_instantiate.load(Ordering::SeqCst) {
            return Err(SandboxError::new("instantiation refused"));
        }
        self.probe.instantiated.fetch_add(1, Ordering::SeqCst);
        Ok(FakeInstance {
            probe: self.probe.clone(),
        })
    }

    fn close(&self) {
        if !self.probe.closed.swap(true, Ordering::SeqCst) {
            self.probe.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeInstance {
    fn drop(&mut self) {
        self.probe.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

fn fail(e: impl ToString) -> SandboxError {
    SandboxError::new(e.to_string())
}

impl ModuleInstance for FakeInstance {
    fn call(&mut self, entry: EntryPoint, input: &[u8]) -> Result<Vec<u8>, SandboxError> {
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.probe.delay_us.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_micros(delay as u64));
        }

        match entry {
            EntryPoint::Tokenize => {
                let req: TokenizeRequest = rmp_serde::from_slice(input).map_err(fail)?;
                rmp_serde::to_vec(&tokenize(&req)?).map_err(fail)
            }
            EntryPoint::Detokenize => {
                let req: DetokenizeRequest = rmp_serde::from_slice(input).map_err(fail)?;
                detokenize(&req).map(String::into_bytes)
            }
            EntryPoint::ChatTemplate => {
                let req: ChatTemplateRequest = rmp_serde::from_slice(input).map_err(fail)?;
                render(&req).map(String::into_bytes)
            }
        }
    }
}

fn tokenize(req: &TokenizeRequest) -> Result<Vec<u32>, SandboxError> {
    if req.text.contains(POISON) {
        return Err(SandboxError::new("poisoned input"));
    }
    let mut out = Vec::new();
    let mut rest = req.text.as_str();
    while !rest.is_empty() {
        if req.include_special_tokens && rest.starts_with(BOS_TEXT) {
            out.push(BOS);
            rest = &rest[BOS_TEXT.len()..];
            continue;
        }
        let ch = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        out.extend(rest[..ch].bytes().map(|b| BYTE_BASE + u32::from(b)));
        rest = &rest[ch..];
    }
    Ok(out)
}

fn detokenize(req: &DetokenizeRequest) -> Result<String, SandboxError> {
    let mut bytes = Vec::new();
    for &id in &req.tokens {
        match id {
            BOS if req.include_special_tokens => bytes.extend_from_slice(BOS_TEXT.as_bytes()),
            BOS => {}
            id if (BYTE_BASE..BYTE_BASE + 256).contains(&id) => bytes.push((id - BYTE_BASE) as u8),
            id => return Err(SandboxError::new(format!("invalid token id {id}"))),
        }
    }
    String::from_utf8(bytes).map_err(fail)
}

fn render(req: &ChatTemplateRequest) -> Result<String, SandboxError> {
    if !req.ignore_message_position {
        let first = req.messages.iter().find(|m| m.role != "system");
        if let Some(m) = first {
            if m.role != "user" {
                return Err(SandboxError::new("conversation must start with a user message"));
            }
        }
    }

    let mut out = String::new();
    for m in &req.messages {
        out.push_str(&format!("<|{}|>\n", m.role));
        if let Some(r) = &m.reasoning_content {
            out.push_str(&format!("<think>{r}</think>"));
        }
        out.push_str(&m.content);
        out.push('\n');
    }
    match req.prefill.clone().unwrap_or_default() {
        Prefill::None => {}
        Prefill::Canonical => {
            out.push_str("<|assistant|>\n");
            if !req.reasoning_enabled {
                out.push_str("<think></think>");
            }
        }
        Prefill::PartialReasoning { reasoning_content } => {
            out.push_str(&format!("<|assistant|>\n<think>{reasoning_content}"));
        }
        Prefill::FullReasoning {
            reasoning_content,
            content,
        } => {
            out.push_str(&format!(
                "<|assistant|>\n<think>{reasoning_content}</think>{content}"
            ));
        }
    }
    Ok(out)
}
