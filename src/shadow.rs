//! Shadow-DOM packaging of rendered markup and extracted CSS.
//!
//! The output is a self-registering `<myco-shadow-box>` snippet: a one-time
//! custom-element definition plus an instance carrying two inert templates
//! (one for CSS, one for HTML). On the client, the element's constructor
//! attaches an open shadow root, applies the base host style, moves both
//! template contents into the root, and removes the template wrappers.
//! Styling inside the boundary cannot leak into the embedding page.

const CSS_SLOT: &str = "/*__CSS__*/";
const HTML_SLOT: &str = "__HTML__";

// Registration is guarded by customElements.get so embedding several
// packages on one page defines the element exactly once.
const SHELL: &str = r#"
<script>
(()=>{const TAG='myco-shadow-box';
if(!window.customElements.get(TAG)){
class MycoShadowBox extends HTMLElement{
  constructor(){
    super();
    const root = this.attachShadow({mode:'open'});
    const base = document.createElement('style');
    base.textContent = `
:host{display:block;box-sizing:border-box}
`;
    const cssT = this.querySelector(':scope > template.shadow-css');
    const htmlT = this.querySelector(':scope > template.shadow-html');
    const userCss = document.createElement('style');
    if (cssT){ userCss.textContent = cssT.content.textContent || ''; cssT.remove(); }
    let htmlFrag = document.createDocumentFragment();
    if (htmlT){ htmlFrag = htmlT.content.cloneNode(true); htmlT.remove(); }
    root.append(base, userCss, htmlFrag);
  }
}
customElements.define(TAG, MycoShadowBox);}
})();
</script>

<myco-shadow-box>
  <template class="shadow-css">/*__CSS__*/</template>
  <template class="shadow-html">__HTML__</template>
</myco-shadow-box>
"#;

/// Package extracted CSS and body markup into the embeddable snippet.
///
/// Pure string template substitution; each placeholder is replaced exactly
/// once so placeholder-looking text inside the payload stays untouched.
pub fn package(css: &str, html: &str) -> String {
    SHELL.replacen(CSS_SLOT, css, 1).replacen(HTML_SLOT, html, 1)
}
