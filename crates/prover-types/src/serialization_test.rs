//! Test serialization round-trip for the queue protocol types

#[cfg(test)]
mod tests {
    use crate::{
        ApiResponse, LeaseId, Proof, ProofAndVk, ProvingJob, ProvingJobId, ProvingJobLease,
        ProvingJobResult, ProvingJobType, PullJobResponse, ResolveRequest, RollupProofOutput,
        TreePosition, VerificationKey,
    };

    fn sample_job() -> ProvingJob {
        let position = TreePosition::new(0, 1, 2);
        ProvingJob {
            id: ProvingJobId::derive(7, ProvingJobType::MergeRollup, position),
            job_type: ProvingJobType::MergeRollup,
            epoch: 7,
            position,
            inputs_uri: crate::ProofUri("mem://abcd".to_string()),
        }
    }

    #[test]
    fn test_lease_roundtrip() {
        let original = ProvingJobLease {
            job: sample_job(),
            lease_id: LeaseId::fresh(),
            lease_timeout_ms: 30_000,
        };

        let json = serde_json::to_string(&original).expect("Serialization should succeed");
        let recovered: ProvingJobLease =
            serde_json::from_str(&json).expect("Deserialization should succeed");

        assert_eq!(original, recovered);
    }

    #[test]
    fn test_resolve_request_roundtrip() {
        let request = ResolveRequest {
            job_id: sample_job().id,
            lease_id: LeaseId::fresh(),
            result: ProvingJobResult::MergeRollup(RollupProofOutput {
                public_inputs: vec![1, 2, 3],
                proof: Proof(vec![4, 5]),
                verification_key: VerificationKey(vec![6]),
            }),
        };

        let json = serde_json::to_string(&request).unwrap();
        let recovered: ResolveRequest = serde_json::from_str(&json).unwrap();

        assert_eq!(request.job_id, recovered.job_id);
        assert_eq!(request.result, recovered.result);
    }

    #[test]
    fn test_result_wire_tag_matches_job_type_name() {
        let result = ProvingJobResult::Tube(ProofAndVk {
            proof: Proof(vec![0xaa]),
            verification_key: VerificationKey(vec![0xbb]),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "tube");
        assert_eq!(json["proof"], "aa");

        let result = ProvingJobResult::PrivateBaseRollup(RollupProofOutput::padding());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "private-base-rollup");
    }

    #[test]
    fn test_pull_response_parses_worker_payload() {
        // The exact JSON a worker sees when the queue is drained.
        let json = r#"{ "lease": null }"#;
        let response: PullJobResponse = serde_json::from_str(json).unwrap();
        assert!(response.lease.is_none());
    }

    #[test]
    fn test_api_envelope_tags() {
        let ok: ApiResponse<u32> = ApiResponse::success(5);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"], 5);

        let err: ApiResponse<u32> = ApiResponse::error("no such job");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "no such job");
    }
}
