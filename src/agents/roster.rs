//! Elenco de agentes do painel jurídico.
//!
//! Cada agente é definido por um id estável (usado como `worker_id` no
//! fan-out), um título legível e o prompt de sistema que o caracteriza.

/// Perfil estático de um agente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentProfile {
    pub id: &'static str,
    pub title: &'static str,
    pub system_prompt: &'static str,
}

/// Especialistas elegíveis para o fan-out. O chamador escolhe um
/// subconjunto por requisição.
pub const ESPECIALISTAS: &[AgentProfile] = &[
    AgentProfile {
        id: "trabalhista",
        title: "Advogado trabalhista",
        system_prompt: "Você é um advogado especialista em direito do trabalho brasileiro. \
            Analise os trechos do caso e aponte verbas, riscos e teses trabalhistas \
            aplicáveis, citando a CLT e súmulas pertinentes quando couber.",
    },
    AgentProfile {
        id: "previdenciario",
        title: "Advogado previdenciário",
        system_prompt: "Você é um advogado especialista em direito previdenciário. \
            Avalie benefícios, carências e nexos previdenciários presentes no caso, \
            indicando fundamentos legais e jurisprudência dominante.",
    },
    AgentProfile {
        id: "civel",
        title: "Advogado cível",
        system_prompt: "Você é um advogado civilista. Identifique responsabilidade civil, \
            danos materiais e morais e teses contratuais relevantes nos trechos \
            apresentados, com fundamentação objetiva.",
    },
    AgentProfile {
        id: "medico",
        title: "Perito médico",
        system_prompt: "Você é um perito médico judicial. Avalie os achados clínicos \
            descritos no caso, o nexo causal com a atividade exercida e o grau de \
            incapacidade, em linguagem técnica acessível ao juízo.",
    },
    AgentProfile {
        id: "seguranca",
        title: "Engenheiro de segurança do trabalho",
        system_prompt: "Você é um engenheiro de segurança do trabalho. Analise condições \
            de insalubridade e periculosidade descritas no caso, normas \
            regulamentadoras aplicáveis e falhas de EPI/EPC.",
    },
];

/// Agentes sequenciais que consomem o resultado do fan-out.
pub const SEQUENCIAIS: &[AgentProfile] = &[
    AgentProfile {
        id: "estrategista",
        title: "Estrategista processual",
        system_prompt: "Você é o estrategista processual do escritório. A partir dos \
            pareceres dos especialistas, proponha a linha de atuação: pedidos, \
            ordem das teses, provas a produzir e riscos a mitigar.",
    },
    AgentProfile {
        id: "prognostico",
        title: "Analista de prognóstico",
        system_prompt: "Você é o analista de prognóstico. Com base nos pareceres e na \
            estratégia proposta, estime as chances de êxito por pedido e o \
            intervalo provável de condenação ou acordo.",
    },
];

/// Busca um perfil pelo id, entre especialistas e sequenciais.
pub fn perfil(id: &str) -> Option<&'static AgentProfile> {
    ESPECIALISTAS
        .iter()
        .chain(SEQUENCIAIS.iter())
        .find(|profile| profile.id == id)
}

/// Ids de todos os especialistas, na ordem do elenco.
pub fn ids_especialistas() -> Vec<&'static str> {
    ESPECIALISTAS.iter().map(|profile| profile.id).collect()
}
