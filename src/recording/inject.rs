//! Capture listener injected into the recorded page.
//!
//! The listener queues raw interaction events inside the page; the recorder
//! drains that queue through the page driver and feeds each event through
//! the selector resolver into the action log. Elements inside cross-origin
//! iframes are not captured; the listener only sees its own document.

use crate::recording::schema::ActionKind;
use crate::selector::ElementSnapshot;
use serde::Deserialize;

/// Installs the capture listener. Idempotent: re-evaluation is a no-op when
/// the listener is already present. Evaluates to `true` on success.
pub const CAPTURE_LISTENER_JS: &str = r#"
(function () {
  if (window.__rehearseCapture) { return true; }

  var queue = [];

  function nodeInfo(el) {
    var classes = [];
    if (el.className && typeof el.className === 'string') {
      classes = el.className.trim().split(/\s+/).filter(function (c) { return c; });
    }
    var index = 1;
    var sib = el;
    while ((sib = sib.previousElementSibling)) {
      if (sib.tagName === el.tagName) { index += 1; }
    }
    return {
      tag: el.tagName.toLowerCase(),
      id: el.id || null,
      classes: classes,
      sibling_index: index
    };
  }

  function snapshot(el) {
    var ancestors = [];
    var cur = el.parentElement;
    while (cur) {
      ancestors.push(nodeInfo(cur));
      cur = cur.parentElement;
    }
    return {
      node: nodeInfo(el),
      name: el.getAttribute ? (el.getAttribute('name') || null) : null,
      text: el.textContent ? el.textContent.trim().substring(0, 200) : null,
      ancestors: ancestors
    };
  }

  function push(kind, el, value) {
    queue.push({
      kind: kind,
      snapshot: el && el.nodeType === 1 ? snapshot(el) : null,
      value: value,
      page_url: window.location.href
    });
  }

  var handlers = {
    click: function (e) { push('click', e.target, null); },
    input: function (e) {
      var t = e.target;
      if (t && 'value' in t && t.tagName !== 'SELECT') { push('input', t, String(t.value)); }
    },
    change: function (e) {
      var t = e.target;
      if (t && t.tagName === 'SELECT') { push('select', t, String(t.value)); }
    },
    keydown: function (e) {
      if (e.key === 'Enter' || e.key === 'Tab' || e.key === 'Escape') {
        push('keypress', e.target, e.key);
      }
    }
  };

  var scrollTimer = null;
  var onScroll = function () {
    if (scrollTimer) { clearTimeout(scrollTimer); }
    scrollTimer = setTimeout(function () {
      push('scroll', null, Math.round(window.scrollX) + ',' + Math.round(window.scrollY));
    }, 200);
  };

  document.addEventListener('click', handlers.click, true);
  document.addEventListener('input', handlers.input, true);
  document.addEventListener('change', handlers.change, true);
  document.addEventListener('keydown', handlers.keydown, true);
  window.addEventListener('scroll', onScroll, true);

  window.__rehearseCapture = { queue: queue, handlers: handlers, onScroll: onScroll };
  window.__rehearseDrain = function () {
    return JSON.stringify(queue.splice(0, queue.length));
  };
  return true;
})()
"#;

/// Drains the in-page queue; evaluates to a JSON array string.
pub const DRAIN_QUEUE_JS: &str =
    "window.__rehearseDrain ? window.__rehearseDrain() : '[]'";

/// Removes the listener and its globals. Safe to run when never installed.
pub const UNINSTALL_LISTENER_JS: &str = r#"
(function () {
  var cap = window.__rehearseCapture;
  if (!cap) { return true; }
  document.removeEventListener('click', cap.handlers.click, true);
  document.removeEventListener('input', cap.handlers.input, true);
  document.removeEventListener('change', cap.handlers.change, true);
  document.removeEventListener('keydown', cap.handlers.keydown, true);
  window.removeEventListener('scroll', cap.onScroll, true);
  delete window.__rehearseCapture;
  delete window.__rehearseDrain;
  return true;
})()
"#;

/// One raw event drained from the page queue.
#[derive(Debug, Clone, Deserialize)]
pub struct CapturedEvent {
    pub kind: ActionKind,
    #[serde(default)]
    pub snapshot: Option<ElementSnapshot>,
    #[serde(default)]
    pub value: Option<String>,
    pub page_url: String,
}

/// Parse the value returned by [`DRAIN_QUEUE_JS`]. Events that fail to
/// deserialize are dropped with a warning rather than aborting the drain.
pub fn parse_drained(value: &serde_json::Value) -> Vec<CapturedEvent> {
    let raw = match value.as_str() {
        Some(s) => s,
        None => return Vec::new(),
    };
    let items: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("Malformed capture queue payload: {}", e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<CapturedEvent>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!("Dropping malformed captured event: {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drained_events() {
        let payload = serde_json::json!(
            "[{\"kind\":\"click\",\"snapshot\":{\"node\":{\"tag\":\"button\",\"id\":\"go\",\"classes\":[],\"sibling_index\":1},\"ancestors\":[]},\"value\":null,\"page_url\":\"https://example.com\"},{\"kind\":\"input\",\"snapshot\":{\"node\":{\"tag\":\"input\",\"id\":\"q\",\"classes\":[],\"sibling_index\":1},\"ancestors\":[]},\"value\":\"hello\",\"page_url\":\"https://example.com\"}]"
        );

        let events = parse_drained(&payload);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ActionKind::Click);
        assert_eq!(events[1].value.as_deref(), Some("hello"));
    }

    #[test]
    fn test_parse_drained_tolerates_junk() {
        let events = parse_drained(&serde_json::json!("not json"));
        assert!(events.is_empty());

        let events = parse_drained(&serde_json::Value::Null);
        assert!(events.is_empty());

        // One good event among malformed ones still comes through.
        let payload = serde_json::json!(
            "[{\"kind\":\"scroll\",\"value\":\"0,400\",\"page_url\":\"https://example.com\"},{\"bogus\":true}]"
        );
        let events = parse_drained(&payload);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActionKind::Scroll);
    }

    #[test]
    fn test_listener_scripts_are_idempotent_guards() {
        assert!(CAPTURE_LISTENER_JS.contains("if (window.__rehearseCapture) { return true; }"));
        assert!(UNINSTALL_LISTENER_JS.contains("if (!cap) { return true; }"));
    }
}
