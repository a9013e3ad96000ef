//! Static Dutch vocabularies: monitored defaults, classifier keywords and the
//! cause taxonomy.
//!
//! Everything here is plain data. Regexes built from these tables live in
//! `patterns`.

// ── Monitored defaults ───────────────────────────────────────────────────

/// Roads watched by default (Brabant / Limburg corridor).
pub const DEFAULT_ROADS: &[&str] = &[
    "A2", "A16", "A50", "A58", "A59", "A65", "A67", "A73", "A76", "A270", "N2", "N69", "N266",
    "N270",
];

pub const DEFAULT_CITIES: &[&str] = &[
    "Eindhoven",
    "Venlo",
    "Weert",
    "'s-Hertogenbosch",
    "Roermond",
    "Maasbracht",
    "Nijmegen",
    "Oss",
    "Zonzeel",
    "Breda",
    "Tilburg",
    "Rotterdam",
    "Deurne",
    "Helmond",
    "Venray",
    "Heerlen",
    "Maastricht",
    "Belgische Grens",
    "Duitse Grens",
    "Valkenswaard",
];

/// Places that commonly show up as direction targets on the same page but
/// are not in the monitored city list.
pub const EXTRA_PLACES: &[&str] = &[
    "Amsterdam",
    "Utrecht",
    "Arnhem",
    "Den Haag",
    "Den Bosch",
    "Dordrecht",
    "Gorinchem",
    "Bergen op Zoom",
    "Roosendaal",
    "Antwerpen",
    "Moerdijk",
    "Sittard",
    "Geleen",
    "Boxtel",
    "Vught",
    "Veghel",
    "Uden",
    "Grave",
    "Best",
    "Zwolle",
    "Amersfoort",
    "Luik",
    "Aken",
    "Keulen",
];

// ── Classifier keywords ──────────────────────────────────────────────────

pub const JAM_DELAY_KEYWORDS: &[&str] = &["min", "minuten", "vertraging"];
pub const JAM_TRAFFIC_KEYWORDS: &[&str] = &["file", "verkeer", "richting", "km"];

pub const FLITSER_KEYWORDS: &[&str] = &["flitser", "camera", "snelheid", "controle", "mobiel"];
pub const FLITSER_LOCATION_KEYWORDS: &[&str] = &["km", "hmp", "hectometer", "richting"];

// ── Cause fallback keywords ──────────────────────────────────────────────

pub const CONGESTION_KEYWORDS: &[&str] = &["file", "druk", "langzaam", "stilstaand", "spits"];
pub const WORK_KEYWORDS: &[&str] = &["werk", "afzetting", "afgezet", "versmalling"];

pub const CAUSE_BUSY: &str = "Drukte";
pub const CAUSE_ROADWORKS: &str = "Werkzaamheden";
pub const CAUSE_RUSH_HOUR: &str = "Spitsuur";

// ── Cause taxonomy ───────────────────────────────────────────────────────

/// A keyword pattern (regex alternation, matched case-insensitively on word
/// boundaries) and the label it normalises to.
pub struct CauseEntry {
    pub pattern: &'static str,
    pub label: &'static str,
}

/// Priority order: earlier entries win ties.
pub static CAUSE_TABLE: &[CauseEntry] = &[
    // ── Accidents / incidents ──
    CauseEntry {
        pattern: r"kettingbotsing(?:en)?",
        label: "Kettingbotsing",
    },
    CauseEntry {
        pattern: r"ongeval(?:len)?|ongeluk(?:ken)?|aanrijding(?:en)?|botsing",
        label: "Ongeval",
    },
    CauseEntry {
        pattern: r"gekantelde?\s+(?:vrachtwagen|aanhanger|caravan|bus)|geschaarde?\s+vrachtwagen",
        label: "Gekanteld voertuig",
    },
    CauseEntry {
        pattern: r"voertuigbrand|autobrand|brandende\s+(?:auto|vrachtwagen|bus)",
        label: "Voertuigbrand",
    },
    CauseEntry {
        pattern: r"pechgeval(?:len)?|pech|defecte\s+(?:auto|vrachtwagen|bus|voertuig)|gestrand(?:e)?\s+voertuig",
        label: "Pechgeval",
    },
    CauseEntry {
        pattern: r"verloren\s+lading|lading\s+op\s+(?:de\s+)?(?:weg|rijbaan)|voorwerp(?:en)?\s+op\s+(?:de\s+)?(?:weg|rijbaan)|obstakel",
        label: "Obstakel op de weg",
    },
    CauseEntry {
        pattern: r"politieonderzoek|politie|onderzoek",
        label: "Politieonderzoek",
    },
    CauseEntry {
        pattern: r"incident(?:en)?",
        label: "Incident",
    },
    // ── Roadworks / closures ──
    CauseEntry {
        pattern: r"wegwerkzaamheden|werkzaamheden|werk\s+aan\s+de\s+weg",
        label: "Werkzaamheden",
    },
    CauseEntry {
        pattern: r"rijstrook(?:afsluiting|\s+dicht)|versmalling",
        label: "Rijstrookafsluiting",
    },
    CauseEntry {
        pattern: r"(?:volledig\s+|gedeeltelijk\s+)?afgesloten|wegafsluiting|afsluiting",
        label: "Afsluiting",
    },
    // ── Weather ──
    CauseEntry {
        pattern: r"gladheid|ijzel|sneeuw(?:val)?|bevroren|ijs",
        label: "Gladheid",
    },
    CauseEntry {
        pattern: r"dichte\s+mist|mist|slecht\s+zicht",
        label: "Mist",
    },
    CauseEntry {
        pattern: r"storm|harde\s+wind|windstoten",
        label: "Storm",
    },
    CauseEntry {
        pattern: r"hoosbui(?:en)?|wateroverlast|onweer|regen",
        label: "Slecht weer",
    },
    // ── Congestion / volume ──
    CauseEntry {
        pattern: r"verkeersdrukte|druk\s+verkeer|veel\s+verkeer|drukte",
        label: CAUSE_BUSY,
    },
    // ── Events ──
    CauseEntry {
        pattern: r"evenement(?:en)?|concert|festival|wedstrijd|voetbal(?:wedstrijd)?|kermis|braderie",
        label: "Evenement",
    },
    // ── Infrastructure ──
    CauseEntry {
        pattern: r"brugopening|brug\s+open|openstaande\s+brug",
        label: "Brugopening",
    },
    CauseEntry {
        pattern: r"tunnelafsluiting|tunnelstoring|tunnel\s+dicht",
        label: "Tunnelafsluiting",
    },
    CauseEntry {
        pattern: r"stroomstoring|storing|verkeerslichten|defecte\s+matrixborden?",
        label: "Storing",
    },
    // ── Time-based ──
    CauseEntry {
        pattern: r"ochtendspits|avondspits|spitsuur|spits",
        label: CAUSE_RUSH_HOUR,
    },
    // ── Emergency services ──
    CauseEntry {
        pattern: r"hulpdiensten|ambulance|brandweer|traumaheli(?:kopter)?|bergingswerkzaamheden|berging",
        label: "Hulpdiensten",
    },
];

// ── Hectometer context ───────────────────────────────────────────────────

/// Words next to a bare number that make it a kilometre marker outright.
pub const STRONG_HECTO_CONTEXT: &[&str] = &["km", "kilometer", "hectometer", "paal", "hmp"];

/// Words that make a bare number a plausible (estimated) marker.
/// "ter hoogte" is matched as the single token "hoogte".
pub const MODERATE_HECTO_CONTEXT: &[&str] = &["richting", "bij", "hoogte", "nabij", "afrit"];

pub const HECTO_ESTIMATED_SUFFIX: &str = " (geschat)";

// ── Camera state ─────────────────────────────────────────────────────────

pub const INACTIVE_PATTERN: &str =
    r"inactief|niet\s+(?:meer\s+)?actief|verwijderd|gestopt|opgeheven|beëindigd|weggehaald";

// ── Place-name heuristic ─────────────────────────────────────────────────

/// Capitalised words that start sentences or labels rather than place names.
/// Stripped from the front of a capitalised run before it is accepted.
pub const PLACE_STOPWORDS: &[&str] = &[
    "Richting", "Naar", "Bij", "Nabij", "Tussen", "Van", "Ter", "Hoogte", "Op", "In", "De", "Het",
    "Een", "Let", "Vanaf", "Flitser", "Flitsers", "Mobiele", "Vaste", "Snelheidscontrole",
    "Controle", "Camera", "File", "Files", "Ongeval", "Werkzaamheden", "Afrit", "Knooppunt",
    "Vertraging", "Lengte", "Oorzaak", "Actief", "Inactief", "Gemeld",
];
