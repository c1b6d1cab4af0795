// Fallback preview component used when the LLM is unavailable

use crate::markup::{escape_html, title_case};

/// Static Tailwind layout echoing the brief
pub fn fallback_component(prompt: &str) -> String {
    let prompt = prompt.trim();
    let title = title_case(prompt.lines().next().unwrap_or(prompt));
    let title = escape_html(&title);
    let brief = escape_html(prompt);

    format!(
        r#"<div class="min-h-screen bg-slate-950 text-slate-50">
  <header class="border-b border-slate-800 px-6 py-5">
    <h1 class="text-2xl font-semibold">{title}</h1>
    <p class="mt-1 text-sm text-slate-400">Starter layout generated from your brief.</p>
  </header>
  <main class="grid gap-6 p-6 sm:grid-cols-2">
    <section class="space-y-4 rounded-xl border border-slate-800 bg-slate-900/60 p-5 shadow-lg">
      <h2 class="text-lg font-medium">Summary</h2>
      <p class="text-sm leading-6 text-slate-300">Key areas requested for "{brief}".</p>
      <ul class="space-y-2 text-sm text-slate-300">
        <li>Edit copy in place once the structure looks right.</li>
        <li>Swap placeholder blocks for real components.</li>
      </ul>
    </section>
    <section class="rounded-xl border border-slate-800 bg-slate-900/40 p-5">
      <h2 class="text-lg font-medium">Next Steps</h2>
      <ol class="mt-4 list-decimal space-y-3 pl-5 text-sm text-slate-300">
        <li>Describe interactions (click targets, shortcuts).</li>
        <li>Ask for layout or colour refinements.</li>
        <li>Approve when the preview looks right.</li>
      </ol>
    </section>
  </main>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_escapes_brief() {
        let html = fallback_component("inventory <script>alert(1)</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("<h1 class=\"text-2xl font-semibold\">Inventory"));
    }
}
