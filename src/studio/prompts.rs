use crate::studio::request::{PartialTattooRequest, TattooRequest};

pub const WELCOME_MESSAGE: &str =
    "Benvenuto! Descrivi il tatuaggio che hai in mente e io creerò un'immagine di riferimento per te.";
pub const GENERATION_REPLY: &str = "Ecco un'idea per il tuo tatuaggio.";
pub const ANALYSIS_REPLY: &str = "Ecco l'analisi della tua immagine.";
pub const GENERATION_ERROR: &str =
    "Spiacente, si è verificato un errore durante la generazione dell'immagine. Riprova.";
pub const UNCONFIGURED_ERROR: &str =
    "Chiave API non configurata: imposta GEMINI_API_KEY e riavvia lo studio.";
pub const NEEDLE_ADVICE_FALLBACK: &str =
    "Analisi degli aghi non disponibile al momento. Consulta il tuo tatuatore per la configurazione più adatta.";

pub const ELEMENTS_CLAUSE: &str = "con elementi aggiuntivi";

pub fn build_generation_prompt(request: &TattooRequest) -> String {
    let elements = request
        .elements()
        .map(|elements| format!(", {ELEMENTS_CLAUSE}: {elements}"))
        .unwrap_or_default();
    format!(
        "Un'immagine di riferimento per un tatuaggio di un {subject}{elements}, in stile {style}. \
Il tatuaggio verrà posizionato su: {placement}. \
Livello di complessità: {complexity}. \
Il tatuaggio è di dimensione {size}. \
Schema di colori: {color}. \
L'immagine dovrebbe essere un design pulito su sfondo bianco, perfetto per un artista tatuatore.",
        subject = request.subject.trim(),
        style = request.style.trim(),
        placement = request.placement.trim(),
        complexity = request.complexity.label(),
        size = request.size.label(),
        color = request.color.trim(),
    )
}

pub fn build_user_request_summary(request: &TattooRequest) -> String {
    let mut lines = vec![
        "Genera un tatuaggio:".to_string(),
        format!("- **Soggetto:** {}", request.subject.trim()),
        format!("- **Stile:** {}", request.style.trim()),
        format!("- **Dimensione:** {}", request.size.label()),
        format!("- **Colori:** {}", request.color.trim()),
        format!("- **Posizione:** {}", request.placement.trim()),
    ];
    if let Some(elements) = request.elements() {
        lines.push(format!("- **Elementi:** {elements}"));
    }
    lines.push(format!("- **Complessità:** {}", request.complexity.label()));
    lines.join("\n")
}

pub fn build_upload_summary(file_name: &str) -> String {
    format!("Analizza questa immagine: {file_name}")
}

fn push_known(lines: &mut Vec<String>, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
        lines.push(format!("- {label}: {value}"));
    }
}

pub fn build_analysis_prompt(details: &PartialTattooRequest) -> String {
    let mut known = Vec::new();
    push_known(&mut known, "Soggetto", details.subject.as_deref());
    push_known(&mut known, "Stile", details.style.as_deref());
    push_known(&mut known, "Dimensione", details.size.map(|size| size.label()));
    push_known(&mut known, "Colori", details.color.as_deref());
    push_known(&mut known, "Posizione", details.placement.as_deref());
    push_known(&mut known, "Elementi aggiuntivi", details.elements.as_deref());
    push_known(
        &mut known,
        "Complessità",
        details.complexity.map(|complexity| complexity.label()),
    );

    let mut prompt = String::from(
        "Sei un tatuatore professionista esperto. Analizza il design del tatuaggio nell'immagine \
e consiglia la configurazione degli aghi per realizzarlo.\n",
    );
    if !known.is_empty() {
        prompt.push_str("\nDettagli forniti dal cliente:\n");
        prompt.push_str(&known.join("\n"));
        prompt.push('\n');
    }
    prompt.push_str(
        "\nRispondi in markdown con tre sezioni:\n\
1. **Liner**: per contorni e linee, con configurazioni concrete (es. 3RL, 5RL, 9RL).\n\
2. **Shader**: per sfumature e riempimenti, con configurazioni concrete (es. 5RS, 7RS, 9RS).\n\
3. **Magnum**: per campiture ampie e gradienti, con configurazioni concrete (es. 7M1, 9M1, 15RM).\n",
    );

    let mut modifiers = Vec::new();
    if details.complexity.is_some() {
        modifiers.push("la complessità del design");
    }
    if details.size.is_some() {
        modifiers.push("la dimensione del tatuaggio");
    }
    if details
        .placement
        .as_deref()
        .is_some_and(|placement| !placement.trim().is_empty())
    {
        modifiers.push("la zona del corpo scelta");
    }
    if !modifiers.is_empty() {
        prompt.push_str(&format!(
            "Adatta i consigli tenendo conto di: {}.\n",
            modifiers.join(", ")
        ));
    }
    prompt.push_str("Sii conciso e pratico.");
    prompt
}

pub fn build_palette_prompt(count: usize) -> String {
    format!(
        "Estrai i {count} colori dominanti di questo design di tatuaggio. \
Restituisci solo un array JSON di stringhe con i codici esadecimali (es. \"#1A2B3C\")."
    )
}

pub fn build_suggestion_prompt(style: &str, count: usize) -> String {
    format!(
        "Suggerisci {count} palette di colori per un tatuaggio in stile \"{}\". \
Ogni suggerimento deve essere una breve descrizione (es. \"Bianco e nero con accenti rossi\"). \
Restituisci solo un array JSON di stringhe.",
        style.trim()
    )
}
