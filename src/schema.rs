//! Target submission formats.
//!
//! Each [`SchemaSpec`] fixes the ordered list of required output columns, the
//! worked example shown to the mapper, and the slug used in storage keys and
//! rule document sections.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaSpec {
    pub name: &'static str,
    pub slug: &'static str,
    pub required: &'static [&'static str],
    pub examples: &'static [(&'static str, &'static str)],
}

pub const SRA: SchemaSpec = SchemaSpec {
    name: "SRA",
    slug: "sra",
    required: &[
        "sample_name",
        "library_ID",
        "title",
        "library_strategy",
        "library_source",
        "library_selection",
        "library_layout",
        "platform",
        "instrument_model",
        "design_description",
        "filetype",
        "filename",
        "filename2",
        "filename3",
        "filename4",
        "assembly",
        "fasta_file",
    ],
    examples: &[
        ("sample_name", "2024GN-00001"),
        ("library_ID", "2024GN-00001"),
        ("title", "WGS of 2024GN-00001"),
        ("library_strategy", "WGS"),
        ("library_source", "GENOMIC"),
        ("library_selection", "RANDOM"),
        ("library_layout", "paired"),
        ("platform", "ILLUMINA"),
        ("instrument_model", "Illumina MiSeq"),
        ("design_description", "Shotgun Library"),
        ("filetype", "fastq"),
        ("filename", "2024GN-00001_R1.fastq.gz"),
        ("filename2", "2024GN-00001_R2.fastq.gz"),
    ],
};

pub const BIOSAMPLE: SchemaSpec = SchemaSpec {
    name: "Biosample",
    slug: "biosample",
    required: &[
        "sample_name",
        "sample_title",
        "bioproject_accession",
        "organism",
        "strain",
        "isolate",
        "collected_by",
        "collection_date",
        "geo_loc_name",
        "host",
        "host_disease",
        "isolation_source",
        "lat_lon",
    ],
    examples: &[
        ("sample_name", "2024GN-00001"),
        ("bioproject_accession", "PRJNA288601"),
        ("organism", "Acinetobacter baumannii"),
        ("strain", "2024GN-00001"),
        ("host", "Homo sapiens"),
        ("isolation_source", "Isolate, Urine"),
        ("collection_date", "2024"),
        ("geo_loc_name", "USA"),
        ("sample_type", "Whole Organism"),
        ("MLST#", "Pasteur ST2"),
    ],
};

pub const ALL: [&SchemaSpec; 2] = [&SRA, &BIOSAMPLE];

impl SchemaSpec {
    pub fn manual_mappings_section(&self) -> String {
        format!("{}_manual_mappings", self.slug)
    }

    pub fn static_section(&self) -> String {
        format!("{}_static", self.slug)
    }

    pub fn exclusions_section(&self) -> String {
        format!("{}_exclusions", self.slug)
    }
}

impl fmt::Display for SchemaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
