use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use proptest::prelude::*;
use rand::rngs::OsRng;

use super::*;

const CONTEXT: &[u8] = b"round-under-test";
const MAX: u64 = 1_000;

type Issuer = CredentialIssuer<RistrettoPoint>;
type Client = CredentialClient<RistrettoPoint>;
type Cred = Credential<RistrettoPoint>;

fn setup(max: u64) -> (Issuer, Client) {
    let issuer = Issuer::new(CredentialIssuerSecretKey::random(&mut OsRng), CONTEXT, max).unwrap();
    let client = Client::new(*issuer.parameters(), CONTEXT, max).unwrap();
    (issuer, client)
}

fn zero_credentials(issuer: &mut Issuer, client: &Client) -> Vec<Cred> {
    let (request, validation) = client.create_zero_request(&mut OsRng);
    let response = issuer.request_zero_credentials(&request, &mut OsRng).unwrap();
    client.handle_response(&response, &validation).unwrap()
}

fn reissue(issuer: &mut Issuer, client: &Client, amounts: &[u64], presented: &[Cred]) -> Vec<Cred> {
    let (request, validation) = client.create_request(amounts, presented, &mut OsRng).unwrap();
    let response = issuer.request_real_credentials(&request, &mut OsRng).unwrap();
    client.handle_response(&response, &validation).unwrap()
}

#[test]
fn test_range_width() {
    assert_eq!(range_width_for(1).unwrap(), 1);
    assert_eq!(range_width_for(1_000).unwrap(), 10);
    assert_eq!(range_width_for(1_023).unwrap(), 10);
    assert_eq!(range_width_for(1_024).unwrap(), 11);
    assert_eq!(range_width_for(100_000_000).unwrap(), 27);
    assert_eq!(range_width_for(0), Err(CredentialError::InvalidMaxValue(0)));
    assert!(range_width_for(u64::MAX).is_err());
}

#[test]
fn test_zero_credentials() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    assert_eq!(zero.len(), CREDENTIAL_COUNT);
    assert!(zero.iter().all(|c| c.is_zero()));
    assert_eq!(issuer.balance(), 0);
    assert_eq!(issuer.spent_count(), 0);
}

#[test]
fn test_real_credentials_split_and_merge() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    let real = reissue(&mut issuer, &client, &[600, 400], &zero);
    assert_eq!(real.iter().map(|c| c.value()).collect::<Vec<_>>(), vec![600, 400]);
    assert_eq!(issuer.balance(), 1_000);

    // redeem 300 worth, keep 700 as change
    let change = reissue(&mut issuer, &client, &[700, 0], &real);
    assert_eq!(change[0].value(), 700);
    assert!(change[1].is_zero());
    assert_eq!(issuer.balance(), 700);
    assert_eq!(issuer.spent_count(), 4);
}

#[test]
fn test_double_spend_rejected() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);
    let real = reissue(&mut issuer, &client, &[500, 500], &zero);

    reissue(&mut issuer, &client, &[1_000, 0], &real);
    let balance = issuer.balance();

    let (request, _) = client.create_request(&[1_000, 0], &real, &mut OsRng).unwrap();
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::SerialNumberAlreadyUsed)
    );
    assert_eq!(issuer.balance(), balance);
}

#[test]
fn test_same_credential_twice_in_one_request() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);
    let real = reissue(&mut issuer, &client, &[500, 500], &zero);

    let (request, _) = client
        .create_request(&[500, 500], &[real[0], real[0]], &mut OsRng)
        .unwrap();
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::DuplicateSerialNumber)
    );
    assert_eq!(issuer.spent_count(), 2);
}

#[test]
fn test_client_refuses_out_of_range_amount() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    assert_eq!(
        client.create_request(&[1_024, 0], &zero, &mut OsRng).err(),
        Some(CredentialError::ValueOutOfRange { value: 1_024, max: 1_023 })
    );
}

#[test]
fn test_forged_too_large_value_rejected() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    let scalars = [Scalar::from(1_024u64), Scalar::from(0u64)];
    let (request, _) =
        client.real_request_from_scalars(&scalars, &[1_024, 0], &zero, 1_024, &mut OsRng);
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidProof)
    );
    assert_eq!(issuer.balance(), 0);
    assert_eq!(issuer.spent_count(), 0);
}

#[test]
fn test_forged_negative_value_rejected() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    // −1 and 1001 balance to 1000, so only the range proof can catch it
    let scalars = [<Scalar as GroupScalar>::from_i64(-1), Scalar::from(1_001u64)];
    let (request, _) = client.real_request_from_scalars(&scalars, &[0, 1_001], &zero, 1_000, &mut OsRng);
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidProof)
    );
}

#[test]
fn test_forged_delta_rejected() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    // claims delta 10 but requests 20
    let scalars = [Scalar::from(10u64), Scalar::from(10u64)];
    let (request, _) = client.real_request_from_scalars(&scalars, &[10, 10], &zero, 10, &mut OsRng);
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidProof)
    );
}

#[test]
fn test_request_bound_to_context() {
    let (mut issuer, _) = setup(MAX);
    let other = Client::new(*issuer.parameters(), b"another-round", MAX).unwrap();

    let (request, _) = other.create_zero_request(&mut OsRng);
    assert_eq!(
        issuer.request_zero_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidProof)
    );
}

#[test]
fn test_credentials_bound_to_issuer() {
    let (mut issuer, client) = setup(MAX);
    let (mut other_issuer, other_client) = setup(MAX);
    let foreign = zero_credentials(&mut other_issuer, &other_client);

    let (request, _) = client.create_request(&[0, 0], &foreign, &mut OsRng).unwrap();
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidProof)
    );
}

#[test]
fn test_tampered_response_rejected() {
    let (mut issuer, client) = setup(MAX);
    let (request, validation) = client.create_zero_request(&mut OsRng);
    let mut response = issuer.request_zero_credentials(&request, &mut OsRng).unwrap();
    response.macs.swap(0, 1);

    assert_eq!(
        client.handle_response(&response, &validation),
        Err(CredentialError::InvalidIssuanceProof)
    );

    response.macs.pop();
    assert_eq!(
        client.handle_response(&response, &validation),
        Err(CredentialError::ResponseMismatch)
    );
}

#[test]
fn test_wrong_request_shape_rejected() {
    let (mut issuer, client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);

    let (mut request, _) = client.create_request(&[1, 2], &zero, &mut OsRng).unwrap();
    request.requested[1].bit_commitments.pop();
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidBitCommitmentCount { expected: 10, got: 9 })
    );

    request.presented.pop();
    assert_eq!(
        issuer.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvalidPresentedCount { expected: 2, got: 1 })
    );
}

#[test]
fn test_negative_balance_is_invariant_violation() {
    let generators = Generators::<RistrettoPoint>::derive();
    let key = CredentialIssuerSecretKey::<RistrettoPoint>::random(&mut OsRng);
    // a second issuer under the same key has never issued anything
    let twin = CredentialIssuerSecretKey::<RistrettoPoint> {
        w: key.w,
        wp: key.wp,
        x0: key.x0,
        x1: key.x1,
        ya: key.ya,
    };
    assert_eq!(key.compute_parameters(&generators), twin.compute_parameters(&generators));

    let mut issuer = Issuer::new(key, CONTEXT, MAX).unwrap();
    let mut fresh = Issuer::new(twin, CONTEXT, MAX).unwrap();
    let client = Client::new(*issuer.parameters(), CONTEXT, MAX).unwrap();

    let zero = zero_credentials(&mut issuer, &client);
    let real = reissue(&mut issuer, &client, &[300, 200], &zero);

    let (request, _) = client.create_request(&[0, 0], &real, &mut OsRng).unwrap();
    assert_eq!(
        fresh.request_real_credentials(&request, &mut OsRng),
        Err(CredentialError::InvariantViolation { balance: 0, delta: -500 })
    );
    assert_eq!(fresh.spent_count(), 0);

    // the issuer that minted them accepts the same request
    assert!(issuer.request_real_credentials(&request, &mut OsRng).is_ok());
    assert_eq!(issuer.balance(), 0);
}

#[test]
fn test_verify_does_not_mutate() {
    let (mut issuer, client) = setup(MAX);
    let (mut other, other_client) = setup(MAX);
    let zero = zero_credentials(&mut issuer, &client);
    let other_zero = zero_credentials(&mut other, &other_client);

    let (request, validation) = client.create_request(&[250, 0], &zero, &mut OsRng).unwrap();
    let (other_request, _) = other_client
        .create_request(&[10, 0], &other_zero, &mut OsRng)
        .unwrap();

    let verified = issuer.verify_real_request(&request).unwrap();
    assert_eq!(verified.delta(), 250);
    assert_eq!(issuer.balance(), 0);
    assert_eq!(issuer.spent_count(), 0);

    let foreign = other.verify_real_request(&other_request).unwrap();
    assert_eq!(
        issuer.issue_verified(foreign, &mut OsRng),
        Err(CredentialError::IssuerMismatch)
    );

    let response = issuer.issue_verified(verified, &mut OsRng).unwrap();
    let real = client.handle_response(&response, &validation).unwrap();
    assert_eq!(real[0].value(), 250);
    assert_eq!(issuer.balance(), 250);

    // a second commit of the same verified request is a double spend
    let stale = issuer.verify_real_request(&request);
    assert_eq!(stale.err(), Some(CredentialError::SerialNumberAlreadyUsed));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    /// Σ issued − Σ accepted presented == Σ live, after every step, and the
    /// issuer's balance tracks it without ever seeing a value
    #[test]
    fn prop_value_conservation(
        first in (0u64..=255, 0u64..=255),
        splits in proptest::collection::vec((0u64..=255, 0u64..=255), 0..3),
    ) {
        let (mut issuer, client) = setup(255);
        let mut live = zero_credentials(&mut issuer, &client);
        let mut issued: i128 = 0;
        let mut presented: i128 = 0;

        for amounts in std::iter::once(first).chain(splits) {
            let amounts = [amounts.0, amounts.1];
            presented += live.iter().map(|c| i128::from(c.value())).sum::<i128>();
            live = reissue(&mut issuer, &client, &amounts, &live);
            issued += live.iter().map(|c| i128::from(c.value())).sum::<i128>();

            let live_sum: i128 = live.iter().map(|c| i128::from(c.value())).sum();
            prop_assert_eq!(live.iter().map(|c| c.value()).collect::<Vec<_>>(), amounts.to_vec());
            prop_assert_eq!(issued - presented, live_sum);
            prop_assert_eq!(issuer.balance(), live_sum);
        }
    }

    /// any credential is accepted at most once, whatever order it is shown in
    #[test]
    fn prop_no_double_spend(order in proptest::collection::vec(0usize..2, 2..5)) {
        let (mut issuer, client) = setup(255);
        let first = zero_credentials(&mut issuer, &client);
        let second = zero_credentials(&mut issuer, &client);
        let pairs = [
            reissue(&mut issuer, &client, &[1, 2], &first),
            reissue(&mut issuer, &client, &[3, 4], &second),
        ];

        let mut accepted = [false, false];
        for index in order {
            let values: u64 = pairs[index].iter().map(|c| c.value()).sum();
            let (request, _) = client.create_request(&[values, 0], &pairs[index], &mut OsRng).unwrap();
            let result = issuer.request_real_credentials(&request, &mut OsRng);
            if accepted[index] {
                prop_assert_eq!(result, Err(CredentialError::SerialNumberAlreadyUsed));
            } else {
                prop_assert!(result.is_ok());
                accepted[index] = true;
            }
        }
    }

    /// values above the range never pass, however the rest of the request looks
    #[test]
    fn prop_range_enforced(excess in 1u64..10_000, keep in 0u64..=255) {
        let (mut issuer, client) = setup(255);
        let zero = zero_credentials(&mut issuer, &client);

        let value = 255 + excess;
        let scalars = [Scalar::from(value), Scalar::from(keep)];
        let delta = (value + keep) as i64;
        let (request, _) = client.real_request_from_scalars(&scalars, &[value, keep], &zero, delta, &mut OsRng);
        prop_assert_eq!(
            issuer.request_real_credentials(&request, &mut OsRng),
            Err(CredentialError::InvalidProof)
        );

        let negative = [<Scalar as GroupScalar>::from_i64(-(excess as i64)), Scalar::from(keep)];
        let delta = keep as i64 - excess as i64;
        let (request, _) = client.real_request_from_scalars(&negative, &[0, keep], &zero, delta, &mut OsRng);
        prop_assert!(issuer.request_real_credentials(&request, &mut OsRng).is_err());
    }
}
